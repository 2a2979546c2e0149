use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::datetime::{normalize_start_end, now_bangkok};
use crate::models::{coerce_bool_like, Event};
use crate::textnorm::{clean_text, decode_entities, enrich_tags, infer_attrs, normalize_url};

/// Why a raw record was rejected. These are expected, frequent failures:
/// they are logged and the record is dropped, never raised to the caller.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid url `{0}`")]
    InvalidUrl(String),
}

// Absolute URL with a recognized scheme, post-normalization.
static VALID_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://[^\s/]+\S*|mailto:[^\s@]+@\S+)$").expect("valid url regex")
});

// Alternate field names seen across sources, in lookup order.
const ID_KEYS: &[&str] = &["id", "event_id", "uid", "@id"];
const TITLE_KEYS: &[&str] = &["title", "name", "headline"];
const URL_KEYS: &[&str] = &["url", "link", "href"];
const IMAGE_KEYS: &[&str] = &["image", "image_url", "thumbnail"];
const VENUE_KEYS: &[&str] = &["venue", "location", "place"];
const DESC_KEYS: &[&str] = &["desc", "description", "summary"];
const START_KEYS: &[&str] = &["start", "start_date", "date_start", "from"];
const END_KEYS: &[&str] = &["end", "end_date", "date_end", "to"];
const TIME_KEYS: &[&str] = &["time", "when", "date", "dates"];
const LABEL_KEYS: &[&str] = &["labels", "editor_labels", "badges"];

/// Validates and coerces a batch of raw fetcher records. Invalid records are
/// dropped with a logged diagnostic; one bad record never aborts the batch.
/// Records with a blank `source` inherit `source_name`.
pub fn ensure_events(raw_records: &[Value], source_name: &str) -> Vec<Event> {
    let mut events = Vec::with_capacity(raw_records.len());
    for raw in raw_records {
        match event_from_raw(raw, source_name) {
            Ok(event) => events.push(event),
            Err(err) => {
                warn!("Invalid event ({err}): {}", fragment(raw));
            }
        }
    }
    events
}

/// Boundary wrapper for a whole fetch result: an upstream failure is logged
/// and surfaced as an empty batch, so one source's outage cannot abort
/// multi-source aggregation.
pub fn ensure_fetched(result: anyhow::Result<Vec<Value>>, source_name: &str) -> Vec<Event> {
    match result {
        Ok(raw_records) => ensure_events(&raw_records, source_name),
        Err(err) => {
            warn!("fetch failed for {source_name}: {err:#}");
            Vec::new()
        }
    }
}

/// Builds one canonical record from a loosely-typed raw mapping.
pub fn event_from_raw(raw: &Value, source_name: &str) -> Result<Event, ValidationError> {
    let map = raw.as_object().ok_or(ValidationError::NotAnObject)?;

    let id = first_string(map, ID_KEYS)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::MissingField("id"))?;

    let title = first_string(map, TITLE_KEYS)
        .map(|s| clean_text(&decode_entities(&s)))
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::MissingField("title"))?;

    let raw_url = first_string(map, URL_KEYS).ok_or(ValidationError::MissingField("url"))?;
    let url = normalize_url(&raw_url);
    if !VALID_URL_RE.is_match(&url) {
        return Err(ValidationError::InvalidUrl(raw_url));
    }

    let source = first_string(map, &["source"])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| source_name.to_string());

    let image = first_string(map, IMAGE_KEYS)
        .map(|s| normalize_url(&s))
        .filter(|s| !s.is_empty());

    let venue = first_string(map, VENUE_KEYS)
        .map(|s| clean_text(&decode_entities(&s)))
        .filter(|s| !s.is_empty());

    let raw_start = first_string(map, START_KEYS);
    let raw_end = first_string(map, END_KEYS);
    let time_str = first_string(map, TIME_KEYS);
    let (start, end) =
        normalize_start_end(raw_start.as_deref(), raw_end.as_deref(), time_str.as_deref());

    let raw_tags = string_list(map, "tags");
    let labels: Vec<String> = LABEL_KEYS
        .iter()
        .flat_map(|key| string_list(map, key))
        .collect();
    let tags = enrich_tags(&raw_tags, &labels);

    let mut raw_categories = string_list(map, "categories");
    if raw_categories.is_empty() {
        raw_categories = string_list(map, "category");
    }
    let categories = enrich_tags(&raw_categories, &[]);

    let desc_raw = first_string(map, DESC_KEYS)
        .map(|s| decode_entities(&s))
        .unwrap_or_default();

    // Inferred flags first; anything the source states explicitly wins.
    // The schema is open: unconsumed top-level fields are kept, not stripped.
    let mut attrs = infer_attrs(&title, &desc_raw);
    for (key, value) in map {
        if is_consumed_key(key) {
            continue;
        }
        attrs.insert(key.clone(), coerce_bool_like(value.clone()));
    }
    if let Some(Value::Object(explicit)) = map.get("attrs") {
        for (key, value) in explicit {
            attrs.insert(key.clone(), coerce_bool_like(value.clone()));
        }
    }

    let mut event = Event {
        id,
        title,
        url,
        source,
        image,
        start,
        end,
        venue,
        desc: String::new(),
        tags,
        categories,
        attrs,
        fetched_at: now_bangkok(),
    };
    event.set_desc(&desc_raw);
    Ok(event)
}

fn is_consumed_key(key: &str) -> bool {
    const CONSUMED: &[&[&str]] = &[
        ID_KEYS, TITLE_KEYS, URL_KEYS, IMAGE_KEYS, VENUE_KEYS, DESC_KEYS, START_KEYS, END_KEYS,
        TIME_KEYS, LABEL_KEYS,
    ];
    key == "source"
        || key == "tags"
        || key == "categories"
        || key == "category"
        || key == "attrs"
        || CONSUMED.iter().any(|keys| keys.contains(&key))
}

fn first_string(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        match map.get(*key) {
            Some(Value::String(s)) => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

fn string_list(map: &Map<String, Value>, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

fn fragment(raw: &Value) -> String {
    let rendered = raw.to_string();
    rendered.chars().take(160).collect()
}
