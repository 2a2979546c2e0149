use log::debug;
use serde_json::Value;

use crate::dedupe::merge_events;
use crate::models::Event;
use crate::score::coolness;
use crate::validate::ensure_fetched;

/// Boundary to the per-source fetchers (JSON-LD extractors, page-specific
/// scrapers, and the like). Fetchers return raw, loosely-typed records;
/// everything downstream of this trait is pure and in-memory.
pub trait EventFetcher: Send + Sync {
    fn name(&self) -> &'static str;
    fn fetch(&self) -> anyhow::Result<Vec<Value>>;
}

/// Runs every fetcher and validates its output. A fetcher failure is
/// logged and contributes an empty batch; one source's outage never aborts
/// the aggregation.
pub fn collect_events(fetchers: &[Box<dyn EventFetcher>]) -> Vec<Event> {
    let mut events = Vec::new();
    for fetcher in fetchers {
        let batch = ensure_fetched(fetcher.fetch(), fetcher.name());
        debug!("{}: {} valid records", fetcher.name(), batch.len());
        events.extend(batch);
    }
    events
}

/// Full pipeline: collect from all sources, merge near-duplicates, score,
/// and sort by descending coolness (id as tiebreak). The stored score lands
/// in `attrs["score"]` so later boost passes can build on it.
pub fn run_pipeline(fetchers: &[Box<dyn EventFetcher>]) -> Vec<Event> {
    let mut events = merge_events(collect_events(fetchers));
    for event in &mut events {
        let score = coolness(event);
        event
            .attrs
            .insert("score".to_string(), serde_json::json!(score));
    }
    events.sort_by(|a, b| {
        let score_a = a.attrs.get("score").and_then(Value::as_f64).unwrap_or(0.0);
        let score_b = b.attrs.get("score").and_then(Value::as_f64).unwrap_or(0.0);
        score_b
            .partial_cmp(&score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedFetcher {
        name: &'static str,
        records: Vec<Value>,
    }

    impl EventFetcher for FixedFetcher {
        fn name(&self) -> &'static str {
            self.name
        }

        fn fetch(&self) -> anyhow::Result<Vec<Value>> {
            Ok(self.records.clone())
        }
    }

    struct FailingFetcher;

    impl EventFetcher for FailingFetcher {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn fetch(&self) -> anyhow::Result<Vec<Value>> {
            Err(anyhow::anyhow!("timeout reading upstream"))
        }
    }

    fn record(id: &str, title: &str, venue: &str, popularity: u64) -> Value {
        json!({
            "id": id,
            "title": title,
            "url": format!("https://example.com/{id}"),
            "venue": venue,
            "popularity": popularity,
        })
    }

    #[test]
    fn pipeline_survives_a_failing_source() {
        let fetchers: Vec<Box<dyn EventFetcher>> = vec![
            Box::new(FailingFetcher),
            Box::new(FixedFetcher {
                name: "timeout",
                records: vec![record("1", "Art Fair", "BACC", 50)],
            }),
        ];
        let events = run_pipeline(&fetchers);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, "timeout");
    }

    #[test]
    fn pipeline_merges_across_sources_and_ranks() {
        let fetchers: Vec<Box<dyn EventFetcher>> = vec![
            Box::new(FixedFetcher {
                name: "timeout",
                records: vec![
                    record("a", "Jazz Night", "Octave", 400),
                    record("b", "Quiet Reading Hour", "Library", 2),
                ],
            }),
            Box::new(FixedFetcher {
                name: "zipevent",
                records: vec![record("c", "jazz night", "octave", 10)],
            }),
        ];
        let events = run_pipeline(&fetchers);
        assert_eq!(events.len(), 2);
        // popularity difference dominates: the jazz merge ranks first
        assert_eq!(events[0].title, "Jazz Night");
        assert_eq!(events[0].attrs["merged_ids"], json!(["a", "c"]));
        assert!(events[0].attrs["score"].as_f64().expect("score") > 0.0);
    }

    #[test]
    fn all_sources_failing_yields_clean_empty_list() {
        let fetchers: Vec<Box<dyn EventFetcher>> = vec![Box::new(FailingFetcher)];
        assert!(run_pipeline(&fetchers).is_empty());
    }
}
