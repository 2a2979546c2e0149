use sha2::{Digest, Sha256};

/// Sentinel etag for an empty result set.
pub const EMPTY_ETAG: &str = "empty";

/// Key under which a `(city, day, flag)` bucket lives in the cache store.
pub fn cache_key(city: &str, day: &str, flag: &str) -> String {
    format!("{}:{}:{}", city.trim(), day.trim(), flag.trim()).to_lowercase()
}

/// Order-independent content fingerprint over a set of record ids. Two
/// result sets with the same ids produce the same etag regardless of
/// ordering; an empty set maps to [`EMPTY_ETAG`].
pub fn generate_etag(ids: &[String]) -> String {
    if ids.is_empty() {
        return EMPTY_ETAG.to_string();
    }
    let mut sorted: Vec<&str> = ids.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    let mut hasher = Sha256::new();
    for id in sorted {
        hasher.update(id.as_bytes());
        hasher.update(b"|");
    }
    format!("{:x}", hasher.finalize())
}
