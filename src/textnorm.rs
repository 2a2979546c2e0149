use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Hard cap on visible description length, in characters.
pub const DESC_CAP: usize = 4000;

static NUMERIC_ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(x?[0-9a-fA-F]+);").expect("valid entity regex"));

static NAMED_ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&nbsp;", " "),
    ("&ndash;", "\u{2013}"),
    ("&mdash;", "\u{2014}"),
    ("&hellip;", "\u{2026}"),
];

/// Editor label -> canonical tag. Unlisted labels are dropped.
static EDITOR_LABELS: &[(&str, &str)] = &[
    ("editor's pick", "picks"),
    ("editors pick", "picks"),
    ("editor's picks", "picks"),
    ("critics' choice", "picks"),
    ("staff pick", "picks"),
    ("featured", "featured"),
    ("hot", "hot"),
    ("trending", "hot"),
];

/// Keyword rule table for [`infer_attrs`]. Substring membership against
/// lowercased title+desc; kept as data so rules are testable in isolation.
static ATTR_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "streetfood",
        &["street food", "streetfood", "hawker", "food stall", "food truck"],
    ),
    ("market", &["market", "bazaar", "flea", "ตลาด"]),
    ("rooftop", &["rooftop", "roof top", "sky bar", "skybar"]),
    (
        "outdoor",
        &["outdoor", "open air", "open-air", "al fresco", "riverside", "garden party"],
    ),
    ("indoor", &["indoor", "museum", "cinema", "convention hall"]),
    (
        "live_music",
        &["live music", "concert", "gig", "jazz", "acoustic", "dj set"],
    ),
    ("art", &["art ", " art", "exhibition", "gallery", "installation", "biennale"]),
    (
        "culture",
        &["culture", "cultural", "temple", "heritage", "traditional", "festival"],
    ),
];

/// Collapses runs of whitespace and trims.
pub fn clean_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Decodes common named HTML entities plus numeric character references.
pub fn decode_entities(input: &str) -> String {
    let mut out = input.to_string();
    for (entity, replacement) in NAMED_ENTITIES {
        if out.contains(entity) {
            out = out.replace(entity, replacement);
        }
    }
    NUMERIC_ENTITY_RE
        .replace_all(&out, |caps: &regex::Captures<'_>| {
            let body = &caps[1];
            let code = if let Some(hex) = body.strip_prefix('x').or_else(|| body.strip_prefix('X'))
            {
                u32::from_str_radix(hex, 16).ok()
            } else {
                body.parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Upgrades protocol-relative and bare-host URLs to https. Anything that
/// already carries an explicit scheme (including `mailto:`) passes through.
pub fn normalize_url(raw: &str) -> String {
    static SCHEME_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").expect("valid scheme regex"));

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if let Some(rest) = trimmed.strip_prefix("//") {
        return format!("https://{rest}");
    }
    if SCHEME_RE.is_match(trimmed) {
        return trimmed.to_string();
    }
    format!("https://{trimmed}")
}

/// Caps a description at [`DESC_CAP`] characters. Returns the visible text
/// and, when truncation happened, the original full text.
pub fn cap_desc(desc: &str) -> (String, Option<String>) {
    if desc.chars().count() <= DESC_CAP {
        return (desc.to_string(), None);
    }
    let mut capped: String = desc.chars().take(DESC_CAP).collect();
    capped.push('\u{2026}');
    (capped, Some(desc.to_string()))
}

/// Lowercases, trims, and dedupes tags preserving first-occurrence order,
/// then appends canonical tags for any recognized editor labels.
pub fn enrich_tags(tags: &[String], editor_labels: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let normalized = clean_text(&tag.to_lowercase());
        if normalized.is_empty() || out.contains(&normalized) {
            continue;
        }
        out.push(normalized);
    }
    for label in editor_labels {
        let key = clean_text(&label.to_lowercase());
        if let Some((_, canonical)) = EDITOR_LABELS.iter().find(|(name, _)| *name == key) {
            let canonical = canonical.to_string();
            if !out.contains(&canonical) {
                out.push(canonical);
            }
        }
    }
    out
}

/// Derives boolean semantic flags from title and description text.
///
/// Best-effort keyword heuristic, not a classifier: false positives and
/// negatives are expected. Every flag in the rule table is always present
/// in the output, defaulting to false.
pub fn infer_attrs(title: &str, desc: &str) -> Map<String, Value> {
    let haystack = format!("{} {}", title, desc).to_lowercase();
    let mut attrs = Map::new();
    for (flag, keywords) in ATTR_KEYWORDS {
        let hit = keywords.iter().any(|kw| haystack.contains(kw));
        attrs.insert((*flag).to_string(), Value::Bool(hit));
    }
    attrs
}
