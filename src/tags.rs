use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::models::{attr_truthy, Event};
use crate::textnorm::clean_text;

/// Groups of phrases treated as equivalent at the exact-match level,
/// covering English and Thai synonyms for the common query categories.
/// Phrases that only share a word ("music" / "live music") deliberately sit
/// in different groups so they meet at token level, not exact level.
static ALIAS_GROUPS: &[&[&str]] = &[
    &["art", "arts", "exhibition", "ศิลปะ", "นิทรรศการ"],
    &["music", "concert", "gig", "ดนตรี", "คอนเสิร์ต"],
    &["food", "dining", "อาหาร"],
    &["street food", "streetfood", "อาหารริมทาง"],
    &["market", "bazaar", "night market", "ตลาด"],
    &["outdoor", "open air", "open-air", "กลางแจ้ง"],
    &["rooftop", "roof top", "sky bar", "รูฟท็อป", "ดาดฟ้า"],
];

/// Boolean attrs that act as virtual tags on the index.
static ATTR_PHRASES: &[(&str, &[&str])] = &[
    ("outdoor", &["outdoor"]),
    ("indoor", &["indoor"]),
    ("rooftop", &["rooftop"]),
    ("market", &["market"]),
    ("streetfood", &["street food", "streetfood"]),
    ("live_music", &["live music"]),
    ("art", &["art"]),
    ("culture", &["culture"]),
];

/// Searchable structure derived from one record's tags and boolean attrs:
/// whole phrases, Latin-script word tokens, and crude English stems.
/// Cheap to build once and reuse across many query evaluations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagIndex {
    phrases: BTreeSet<String>,
    tokens: BTreeSet<String>,
    stems: BTreeSet<String>,
}

impl TagIndex {
    pub fn for_event(event: &Event) -> Self {
        build_tag_index(&event.tags, &event.attrs)
    }
}

/// Builds the phrase/token/stem index. Non-Latin phrases are kept whole;
/// Latin phrases additionally contribute word tokens and stems.
pub fn build_tag_index(tags: &[String], attrs: &Map<String, Value>) -> TagIndex {
    let mut index = TagIndex::default();
    for tag in tags {
        add_phrase(&mut index, tag);
    }
    for (flag, phrases) in ATTR_PHRASES {
        let enabled = attrs.get(*flag).map(attr_truthy).unwrap_or(false);
        if enabled {
            for phrase in *phrases {
                add_phrase(&mut index, phrase);
            }
        }
    }
    index
}

/// Scores a free-text query against an index: 2 for an exact phrase or
/// alias-phrase hit, 1 for token/stem overlap, 0 otherwise. Matching never
/// uses substring containment, so "art" cannot match inside "party".
pub fn match_score(query: &str, index: &TagIndex) -> u8 {
    let normalized = normalize_phrase(query);
    if normalized.is_empty() {
        return 0;
    }

    if index.phrases.contains(&normalized)
        || aliases_of(&normalized)
            .iter()
            .any(|alias| index.phrases.contains(*alias))
    {
        return 2;
    }

    let mut tokens: BTreeSet<String> = BTreeSet::new();
    let mut stems: BTreeSet<String> = BTreeSet::new();
    collect_tokens(&normalized, &mut tokens, &mut stems);
    for alias in aliases_of(&normalized) {
        collect_tokens(alias, &mut tokens, &mut stems);
    }

    if tokens.iter().any(|t| index.tokens.contains(t))
        || stems.iter().any(|s| index.stems.contains(s))
    {
        return 1;
    }

    0
}

/// Filters events matching the query at any level, strongest matches first.
/// The sort is stable, so input order breaks score ties.
pub fn resolve_flag<'a>(query: &str, events: &'a [Event]) -> Vec<&'a Event> {
    let mut matched: Vec<(u8, &Event)> = events
        .iter()
        .map(|event| (match_score(query, &TagIndex::for_event(event)), event))
        .filter(|(score, _)| *score > 0)
        .collect();
    matched.sort_by(|a, b| b.0.cmp(&a.0));
    matched.into_iter().map(|(_, event)| event).collect()
}

fn add_phrase(index: &mut TagIndex, raw: &str) {
    let phrase = normalize_phrase(raw);
    if phrase.is_empty() {
        return;
    }
    collect_tokens(&phrase, &mut index.tokens, &mut index.stems);
    index.phrases.insert(phrase);
}

fn normalize_phrase(raw: &str) -> String {
    clean_text(&raw.to_lowercase())
}

fn collect_tokens(phrase: &str, tokens: &mut BTreeSet<String>, stems: &mut BTreeSet<String>) {
    // Non-Latin scripts (Thai in particular) have no useful whitespace
    // token boundaries here, so those phrases stay whole.
    if !phrase.is_ascii() {
        return;
    }
    for token in phrase
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        stems.insert(stem(token));
        tokens.insert(token.to_string());
    }
}

fn aliases_of(phrase: &str) -> Vec<&'static str> {
    let mut out = Vec::new();
    for group in ALIAS_GROUPS {
        if group.contains(&phrase) {
            for member in *group {
                if *member != phrase {
                    out.push(*member);
                }
            }
        }
    }
    out
}

// Crude English stemmer: "parties" -> "party", "matches" -> "match",
// "markets" -> "market", "glass" -> "glass".
fn stem(token: &str) -> String {
    if token.len() > 4 && token.ends_with("ies") {
        return format!("{}y", &token[..token.len() - 3]);
    }
    if token.len() > 3
        && ["ches", "shes", "sses", "xes", "zes", "oes"]
            .iter()
            .any(|suffix| token.ends_with(suffix))
    {
        return token[..token.len() - 2].to_string();
    }
    if token.len() > 1 && token.ends_with('s') && !token.ends_with("ss") {
        return token[..token.len() - 1].to_string();
    }
    token.to_string()
}
