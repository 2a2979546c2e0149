use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::datetime::now_bangkok;
use crate::models::Event;

// Convex combination: the weights sum to 1.0.
const W_SOURCE: f64 = 0.25;
const W_POPULARITY: f64 = 0.35;
const W_PRICE: f64 = 0.10;
const W_TIME_SLOT: f64 = 0.08;
const W_VENUE: f64 = 0.12;
const W_TEXT: f64 = 0.08;
const W_FRESH: f64 = 0.02;

/// Popularity counts saturate near this ceiling.
const POPULARITY_CEILING: f64 = 500.0;
/// Price (THB) at which the price sub-score bottoms out.
const EXPENSIVE_THB: f64 = 2000.0;

/// Source authority by domain substring; unknown sources score low,
/// a missing source slightly lower.
static SOURCE_AUTHORITY: &[(&str, f64)] = &[
    ("timeout", 0.95),
    ("bk-magazine", 0.85),
    ("bkmagazine", 0.85),
    ("ticketmelon", 0.70),
    ("eventbrite", 0.65),
    ("zipevent", 0.60),
    ("jsonld", 0.50),
];
const UNKNOWN_SOURCE_SCORE: f64 = 0.30;
const MISSING_SOURCE_SCORE: f64 = 0.25;

static VENUE_PRESTIGE: &[(&str, f64)] = &[
    ("bacc", 0.90),
    ("river city", 0.85),
    ("iconsiam", 0.80),
    ("icon siam", 0.80),
    ("warehouse 30", 0.75),
    ("lido connect", 0.75),
    ("centralworld", 0.70),
    ("central world", 0.70),
    ("thonglor", 0.65),
];
const DEFAULT_VENUE_SCORE: f64 = 0.45;

/// Venues worth an extra editorial boost on top of prestige.
static TOP_VENUES: &[&str] = &["bacc", "river city", "iconsiam", "icon siam"];

static HIGH_SIGNAL_KEYWORDS: &[&str] = &[
    "festival",
    "premiere",
    "biennale",
    "grand opening",
    "pop-up",
    "exclusive",
    "one night only",
];

static BOOST_KEYWORDS: &[&str] = &["festival", "opening", "premiere"];

static EVENING_CUES: &[&str] = &[
    "night", "evening", "sunset", "midnight", "late", "club", "bar",
];

// Clock times like "7pm" / "10:30 PM" count only from 6pm; "2pm matinee"
// is not nightlife.
static EVENING_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(1?\d)(?::\d{2})?\s*pm\b").expect("valid evening time regex"));

/// Heuristic ranking score in roughly [0, 1]: a fixed weighted combination
/// of source authority, popularity, price, time slot, venue prestige, text
/// cues, and freshness. Rounded to 4 decimals for reproducibility.
pub fn coolness(event: &Event) -> f64 {
    let total = W_SOURCE * source_score(event)
        + W_POPULARITY * popularity_score(event)
        + W_PRICE * price_score(event)
        + W_TIME_SLOT * time_slot_score(event)
        + W_VENUE * venue_score(event)
        + W_TEXT * text_score(event)
        + W_FRESH * fresh_score(event);
    round4(total)
}

/// Additive editorial adjustment layered on top of a previously stored
/// score (`attrs["score"]`, default 0). Unbounded above: this is a ranking
/// signal, not a probability.
pub fn boost(event: &Event) -> f64 {
    let mut score = event
        .attrs
        .get("score")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    let text = haystack(event);
    if BOOST_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        score += 0.3;
    }
    if let Some(venue) = &event.venue {
        let lowered = venue.to_lowercase();
        if TOP_VENUES.iter().any(|name| lowered.contains(name)) {
            score += 0.2;
        }
    }
    if event.tags.iter().any(|t| t == "picks") {
        score += 0.5;
    }
    if event.tags.iter().any(|t| t == "hot") {
        score += 0.3;
    }
    round4(score)
}

fn source_score(event: &Event) -> f64 {
    let source = event.source.trim().to_lowercase();
    if source.is_empty() {
        return MISSING_SOURCE_SCORE;
    }
    SOURCE_AUTHORITY
        .iter()
        .find(|(name, _)| source.contains(name))
        .map(|(_, score)| *score)
        .unwrap_or(UNKNOWN_SOURCE_SCORE)
}

fn popularity_score(event: &Event) -> f64 {
    let count = event
        .attrs
        .get("popularity")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    if count <= 0.0 {
        return 0.0;
    }
    ((1.0 + count).ln() / (1.0 + POPULARITY_CEILING).ln()).min(1.0)
}

fn price_score(event: &Event) -> f64 {
    let price = event
        .attrs
        .get("price_min")
        .or_else(|| event.attrs.get("price"))
        .and_then(Value::as_f64);
    match price {
        Some(p) if p == 0.0 => 1.0,
        Some(p) if p > 0.0 => (1.0 - (p / EXPENSIVE_THB).min(1.0)) * 0.9,
        _ => 0.5,
    }
}

fn time_slot_score(event: &Event) -> f64 {
    let mut cues = event
        .attrs
        .get("time")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase();
    for category in &event.categories {
        cues.push(' ');
        cues.push_str(&category.to_lowercase());
    }
    let evening_hour = event
        .start
        .map(|start| chrono::Timelike::hour(&start) >= 18)
        .unwrap_or(false);
    if evening_hour
        || EVENING_CUES.iter().any(|cue| cues.contains(cue))
        || evening_clock_time(&cues)
    {
        1.0
    } else {
        0.5
    }
}

fn evening_clock_time(text: &str) -> bool {
    EVENING_TIME_RE.captures_iter(text).any(|caps| {
        caps[1]
            .parse::<u32>()
            .map(|hour| (6..=11).contains(&hour))
            .unwrap_or(false)
    })
}

fn venue_score(event: &Event) -> f64 {
    let Some(venue) = &event.venue else {
        return DEFAULT_VENUE_SCORE;
    };
    let lowered = venue.to_lowercase();
    VENUE_PRESTIGE
        .iter()
        .find(|(name, _)| lowered.contains(name))
        .map(|(_, score)| *score)
        .unwrap_or(DEFAULT_VENUE_SCORE)
}

fn text_score(event: &Event) -> f64 {
    let text = haystack(event);
    if HIGH_SIGNAL_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        1.0
    } else {
        0.5
    }
}

// Events happening today (Bangkok) get the bonus; anything unparseable or
// undated takes the safe lower branch.
fn fresh_score(event: &Event) -> f64 {
    let today = now_bangkok().date_naive();
    match (event.start, event.end) {
        (Some(start), Some(end)) => {
            if start.date_naive() <= today && today <= end.date_naive() {
                1.0
            } else {
                0.5
            }
        }
        (Some(start), None) => {
            if start.date_naive() == today {
                1.0
            } else {
                0.5
            }
        }
        _ => 0.5,
    }
}

fn haystack(event: &Event) -> String {
    format!("{} {}", event.title, event.desc).to_lowercase()
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::{now_bangkok, parse_date};
    use serde_json::{json, Map};

    fn base_event() -> Event {
        Event {
            id: "1".to_string(),
            title: "Quiet Talk".to_string(),
            url: "https://example.com/1".to_string(),
            source: "eventbrite".to_string(),
            image: None,
            start: None,
            end: None,
            venue: None,
            desc: String::new(),
            tags: Vec::new(),
            categories: Vec::new(),
            attrs: Map::new(),
            fetched_at: now_bangkok(),
        }
    }

    #[test]
    fn coolness_is_deterministic_and_bounded() {
        let mut event = base_event();
        event.attrs.insert("popularity".to_string(), json!(120));
        event.attrs.insert("price_min".to_string(), json!(350));
        let first = coolness(&event);
        let second = coolness(&event);
        assert_eq!(first, second);
        assert!((0.0..=1.0).contains(&first));
        // 4-decimal reproducibility
        assert!((first * 10_000.0).fract().abs() < 1e-6);
    }

    #[test]
    fn free_events_outscore_paid_ones() {
        let mut free = base_event();
        free.attrs.insert("price_min".to_string(), json!(0));
        let mut cheap = base_event();
        cheap.attrs.insert("price_min".to_string(), json!(100));
        let mut pricey = base_event();
        pricey.attrs.insert("price_min".to_string(), json!(5000));
        let unknown = base_event();

        assert!(coolness(&free) > coolness(&cheap));
        assert!(coolness(&cheap) > coolness(&pricey));
        assert!(price_score(&unknown) == 0.5);
        assert!(price_score(&pricey) == 0.0);
    }

    #[test]
    fn popularity_saturates_at_ceiling() {
        let mut at_ceiling = base_event();
        at_ceiling
            .attrs
            .insert("popularity".to_string(), json!(POPULARITY_CEILING));
        let mut beyond = base_event();
        beyond.attrs.insert("popularity".to_string(), json!(50_000));
        assert!((popularity_score(&at_ceiling) - 1.0).abs() < 1e-9);
        assert!((popularity_score(&beyond) - 1.0).abs() < 1e-9);
        assert_eq!(popularity_score(&base_event()), 0.0);
    }

    #[test]
    fn known_source_outscores_unknown_and_missing() {
        let known = base_event();
        let mut unknown = base_event();
        unknown.source = "some-blog".to_string();
        let mut missing = base_event();
        missing.source = "  ".to_string();
        assert!(source_score(&known) > source_score(&unknown));
        assert!(source_score(&unknown) > source_score(&missing));
    }

    #[test]
    fn festival_keyword_lifts_text_score() {
        let mut plain = base_event();
        plain.set_desc("an ordinary gathering");
        let mut festival = base_event();
        festival.set_desc("the annual river festival returns");
        assert!(coolness(&festival) > coolness(&plain));
    }

    #[test]
    fn todays_events_are_fresher() {
        let mut today = base_event();
        today.start = Some(now_bangkok());
        today.end = today.start;
        let mut future = base_event();
        future.start = parse_date("2030-01-01", None);
        future.end = future.start;
        assert!(fresh_score(&today) > fresh_score(&future));
    }

    #[test]
    fn evening_cues_lift_time_slot() {
        let mut night = base_event();
        night
            .attrs
            .insert("time".to_string(), json!("9pm till late"));
        assert_eq!(time_slot_score(&night), 1.0);
        assert_eq!(time_slot_score(&base_event()), 0.5);
    }

    #[test]
    fn afternoon_pm_times_are_not_nightlife() {
        let mut matinee = base_event();
        matinee
            .attrs
            .insert("time".to_string(), json!("2pm matinee screening"));
        assert_eq!(time_slot_score(&matinee), 0.5);

        let mut show = base_event();
        show.attrs.insert("time".to_string(), json!("doors 7:30 PM"));
        assert_eq!(time_slot_score(&show), 1.0);

        let mut noon = base_event();
        noon.attrs.insert("time".to_string(), json!("12pm start"));
        assert_eq!(time_slot_score(&noon), 0.5);
    }

    #[test]
    fn prestige_venue_outscores_unlisted() {
        let mut listed = base_event();
        listed.venue = Some("BACC Main Hall".to_string());
        let mut unlisted = base_event();
        unlisted.venue = Some("Somewhere Else".to_string());
        assert!(venue_score(&listed) > venue_score(&unlisted));
        assert_eq!(venue_score(&base_event()), DEFAULT_VENUE_SCORE);
    }

    #[test]
    fn boost_adds_editorial_increments() {
        let mut event = base_event();
        event.attrs.insert("score".to_string(), json!(0.6));
        event.tags = vec!["picks".to_string(), "hot".to_string()];
        event.title = "Gallery Opening".to_string();
        event.venue = Some("River City Bangkok".to_string());
        // 0.6 + 0.3 (opening) + 0.2 (top venue) + 0.5 (picks) + 0.3 (hot)
        assert!((boost(&event) - 1.9).abs() < 1e-9);
    }

    #[test]
    fn boost_defaults_to_zero_prior() {
        let event = base_event();
        assert_eq!(boost(&event), 0.0);
    }
}
