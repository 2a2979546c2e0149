//! Aggregation core for Bangkok "things to do" listings.
//!
//! Raw records from heterogeneous fetchers flow through validation
//! ([`ensure_events`]), date/text normalization, near-duplicate merging
//! ([`merge_events`]), and heuristic ranking ([`coolness`] / [`boost`]),
//! producing a deduplicated, tag-searchable, ranked record set ready for
//! cache population or direct API responses.
//!
//! The core is pure and synchronous: no I/O, no shared mutable state, only
//! fixed read-only lookup tables. Fetchers, the HTTP layer, and the cache
//! store are external collaborators behind the [`sources`] and [`cache`]
//! boundaries.

pub mod cache;
pub mod datetime;
pub mod dedupe;
pub mod models;
pub mod score;
pub mod sources;
pub mod tags;
pub mod textnorm;
pub mod validate;

pub use cache::{cache_key, generate_etag};
pub use datetime::{normalize_start_end, parse_date, parse_range};
pub use dedupe::merge_events;
pub use models::Event;
pub use score::{boost, coolness};
pub use sources::{collect_events, run_pipeline, EventFetcher};
pub use tags::{build_tag_index, match_score, resolve_flag, TagIndex};
pub use textnorm::{enrich_tags, infer_attrs};
pub use validate::ensure_events;
