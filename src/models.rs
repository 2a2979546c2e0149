use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::datetime::now_bangkok;
use crate::textnorm::{cap_desc, clean_text};

/// Canonical event/place record, the common shape every source normalizes
/// into. Core fields are typed; everything else a source reports lands in
/// `attrs` untouched. Records are value objects: merging builds new ones.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub image: Option<String>,
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
    pub venue: Option<String>,
    pub desc: String,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub attrs: Map<String, Value>,
    #[serde(default = "now_bangkok")]
    pub fetched_at: DateTime<FixedOffset>,
}

impl Event {
    /// Fingerprint of the real-world event this record describes: a sha256
    /// over normalized title and venue, independent of source, url, and id.
    pub fn identity_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.normalized_title().as_bytes());
        hasher.update(b"|");
        hasher.update(self.normalized_venue().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub(crate) fn normalized_title(&self) -> String {
        clean_text(&self.title.to_lowercase())
    }

    pub(crate) fn normalized_venue(&self) -> String {
        self.venue
            .as_deref()
            .map(|v| clean_text(&v.to_lowercase()))
            .unwrap_or_default()
    }

    /// Sets the visible description, enforcing the length cap. The full
    /// original text is kept at `attrs["desc_full"]` when truncation occurs.
    pub fn set_desc(&mut self, desc: &str) {
        let (visible, full) = cap_desc(desc);
        self.desc = visible;
        if let Some(full) = full {
            self.attrs
                .insert("desc_full".to_string(), Value::String(full));
        }
    }

    /// Inserts an attr, coercing boolean-like strings to real booleans.
    pub fn set_attr(&mut self, key: &str, value: Value) {
        self.attrs.insert(key.to_string(), coerce_bool_like(value));
    }
}

/// Boolean-like strings (`"yes"`, `"FALSE"`, `"1"`, ...) become real
/// booleans; anything else passes through unchanged.
pub fn coerce_bool_like(value: Value) -> Value {
    if let Value::String(ref s) = value {
        match s.trim().to_lowercase().as_str() {
            "yes" | "true" | "y" | "1" | "on" => return Value::Bool(true),
            "no" | "false" | "n" | "0" | "off" => return Value::Bool(false),
            _ => {}
        }
    }
    value
}

/// Best-effort truthiness for an attr value where a boolean is expected:
/// falsy-looking values map to false, everything else to true.
pub fn attr_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::String(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "" | "no" | "false" | "n" | "0" | "off"
        ),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        _ => true,
    }
}
