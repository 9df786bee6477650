// src/ct_log/types.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Open field mapping shared by flattened and merged records.
pub type Fields = Map<String, Value>;

pub const STATE_USABLE: &str = "usable";
pub const STATE_PENDING: &str = "pending";
pub const STATE_REJECTED: &str = "rejected";

/// Which log list a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Publisher {
    Apple,
    Google,
}

impl Publisher {
    /// Prefix used for conflicting fields and presence markers
    pub fn prefix(self) -> &'static str {
        match self {
            Publisher::Apple => "apple",
            Publisher::Google => "google",
        }
    }

    pub fn prefixed(self, field: &str) -> String {
        format!("{}_{}", self.prefix(), field)
    }
}

impl fmt::Display for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Publisher::Apple => f.write_str("Apple"),
            Publisher::Google => f.write_str("Google"),
        }
    }
}

/// Log list document (v3 layout, shared by both publishers)
///
/// Only the operator nesting is typed; each log entry stays an open mapping
/// so that every publisher field survives into the merged output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogListDocument {
    pub operators: Vec<Operator>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operator {
    pub name: String,
    #[serde(default)]
    pub logs: Vec<Fields>,
    #[serde(default)]
    pub tiled_logs: Vec<Fields>,
}

/// One log from one publisher, after flattening
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogRecord {
    pub fields: Fields,
}

impl LogRecord {
    pub fn new(fields: Fields) -> Self {
        Self { fields }
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// `url`, falling back to `submission_url` for tiled logs
    pub fn canonical_key(&self) -> Option<&str> {
        canonical_key(&self.fields)
    }
}

/// Union of one Apple and/or one Google record for the same log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergedLogRecord {
    pub fields: Fields,
}

impl MergedLogRecord {
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn canonical_key(&self) -> Option<&str> {
        canonical_key(&self.fields)
    }

    pub fn state(&self) -> Option<&str> {
        self.get_str("state")
    }

    pub fn end(&self) -> Option<&str> {
        self.get_str("end")
    }

    pub fn present_in(&self, publisher: Publisher) -> bool {
        self.fields
            .get(&publisher.prefixed("present"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// `url`, falling back to `submission_url`; empty strings count as missing
pub fn canonical_key(fields: &Fields) -> Option<&str> {
    let non_empty = |field: &str| {
        fields
            .get(field)
            .and_then(Value::as_str)
            .filter(|key| !key.is_empty())
    };
    non_empty("url").or_else(|| non_empty("submission_url"))
}

/// Response from CT log's get-roots endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRootsResponse {
    pub certificates: Vec<String>, // base64-encoded DER
}

/// Per-log snapshot of accepted root fingerprints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRootManifest {
    pub fingerprints: Vec<String>,
}

impl LogRootManifest {
    /// Sorts and deduplicates the given fingerprints
    pub fn from_fingerprints(mut fingerprints: Vec<String>) -> Self {
        fingerprints.sort();
        fingerprints.dedup();
        Self { fingerprints }
    }
}
