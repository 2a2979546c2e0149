use std::collections::HashMap;

use log::debug;
use serde_json::Value;
use strsim::normalized_levenshtein;

use crate::models::Event;

/// Conservative similarity floor for fuzzy title grouping: catches
/// single-typo variants without gluing distinct events together.
pub const FUZZY_TITLE_THRESHOLD: f64 = 0.85;

/// Per-source priority ranking used when reconciling merged fields.
/// Substring-matched against the lowercased source; earlier wins.
/// Unknown sources rank last.
static SOURCE_PRIORITY: &[&str] = &[
    "timeout",
    "bk-magazine",
    "bkmagazine",
    "ticketmelon",
    "eventbrite",
    "zipevent",
    "jsonld",
];

pub(crate) fn source_rank(source: &str) -> usize {
    let lowered = source.to_lowercase();
    SOURCE_PRIORITY
        .iter()
        .position(|name| lowered.contains(name))
        .unwrap_or(SOURCE_PRIORITY.len())
}

/// Collapses near-identical records from different sources into one
/// representative per real-world event.
///
/// Records group on exact identity-key equality, plus fuzzy title
/// similarity when venues match and date ranges overlap. Input is sorted
/// canonically before grouping, so the result does not depend on input
/// order.
pub fn merge_events(records: Vec<Event>) -> Vec<Event> {
    let mut sorted = records;
    sorted.sort_by_cached_key(|e| (e.identity_key(), source_rank(&e.source), e.id.clone()));

    // Exact identity first: equal keys always land in the same group, no
    // matter what the fuzzy pass does afterwards.
    let mut exact_groups: Vec<Vec<Event>> = Vec::new();
    let mut slot_by_key: HashMap<String, usize> = HashMap::new();
    for record in sorted {
        let key = record.identity_key();
        match slot_by_key.get(&key) {
            Some(&idx) => exact_groups[idx].push(record),
            None => {
                slot_by_key.insert(key, exact_groups.len());
                exact_groups.push(vec![record]);
            }
        }
    }

    // Fuzzy pass unions whole exact groups by comparing representatives,
    // so identity-key twins can never be separated.
    let mut groups: Vec<Vec<Event>> = Vec::new();
    for group in exact_groups {
        let slot = groups.iter().position(|existing| {
            match (existing.first(), group.first()) {
                (Some(head), Some(candidate)) => fuzzy_same(head, candidate),
                _ => false,
            }
        });
        match slot {
            Some(idx) => groups[idx].extend(group),
            None => groups.push(group),
        }
    }

    debug!("merged {} groups", groups.len());
    groups.into_iter().map(merge_group).collect()
}

fn fuzzy_same(a: &Event, b: &Event) -> bool {
    let venue_a = a.normalized_venue();
    let venue_b = b.normalized_venue();
    if venue_a.is_empty() || venue_a != venue_b {
        return false;
    }
    if !dates_overlap(a, b) {
        return false;
    }
    normalized_levenshtein(&a.normalized_title(), &b.normalized_title()) >= FUZZY_TITLE_THRESHOLD
}

// Missing dates count as overlapping; many listings carry none.
fn dates_overlap(a: &Event, b: &Event) -> bool {
    match (a.start, a.end, b.start, b.end) {
        (Some(a_start), Some(a_end), Some(b_start), Some(b_end)) => {
            a_start.date_naive() <= b_end.date_naive() && b_start.date_naive() <= a_end.date_naive()
        }
        _ => true,
    }
}

/// Folds one equivalence class into a single record. Scalar fields come
/// from the highest-priority source that has them; the longest description
/// wins; tags and categories are unioned; provenance is recorded under
/// `attrs.merged_ids` and `attrs.sources`.
fn merge_group(mut members: Vec<Event>) -> Event {
    members.sort_by_cached_key(|m| (source_rank(&m.source), m.id.clone()));

    let mut merged = members[0].clone();

    for other in &members[1..] {
        if merged.start.is_none() {
            merged.start = other.start;
        }
        if merged.end.is_none() {
            merged.end = other.end;
        }
        if merged.venue.is_none() {
            merged.venue = other.venue.clone();
        }
        if merged.image.is_none() {
            merged.image = other.image.clone();
        }
        for tag in &other.tags {
            if !merged.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                merged.tags.push(tag.clone());
            }
        }
        for category in &other.categories {
            if !merged
                .categories
                .iter()
                .any(|c| c.eq_ignore_ascii_case(category))
            {
                merged.categories.push(category.clone());
            }
        }
        for (key, value) in &other.attrs {
            merged.attrs.entry(key.clone()).or_insert(value.clone());
        }
    }

    let best_desc = members
        .iter()
        .map(full_desc)
        .max_by_key(|desc| desc.chars().count())
        .unwrap_or_default();
    merged.attrs.remove("desc_full");
    merged.set_desc(&best_desc);

    let mut merged_ids: Vec<String> = members.iter().map(|m| m.id.clone()).collect();
    merged_ids.sort();
    merged_ids.dedup();
    let mut sources: Vec<String> = members.iter().map(|m| m.source.clone()).collect();
    sources.sort();
    sources.dedup();
    merged.attrs.insert(
        "merged_ids".to_string(),
        Value::Array(merged_ids.into_iter().map(Value::String).collect()),
    );
    merged.attrs.insert(
        "sources".to_string(),
        Value::Array(sources.into_iter().map(Value::String).collect()),
    );

    merged
}

// The most informative text a member carries: the preserved full text when
// the visible desc was capped, otherwise the visible desc.
fn full_desc(event: &Event) -> String {
    event
        .attrs
        .get("desc_full")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| event.desc.clone())
}
