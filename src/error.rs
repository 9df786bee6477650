// src/error.rs
use thiserror::Error;

use crate::ct_log::types::Publisher;

/// Faults in the publisher documents that make a run impossible.
///
/// These abort the run before anything is written. Per-log harvesting
/// failures are not represented here; they are logged and skipped.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error("{operator}: log entry has no description")]
    MissingDescription { operator: String },

    #[error("{operator}/{log}: state object is empty")]
    EmptyState { operator: String, log: String },

    #[error("{operator}/{log}: state '{state}' has no timestamp")]
    MissingStateTimestamp {
        operator: String,
        log: String,
        state: String,
    },

    #[error("{operator}/{log}: temporal_interval is missing '{field}'")]
    MalformedInterval {
        operator: String,
        log: String,
        field: &'static str,
    },

    #[error("{publisher} log '{log}' has neither url nor submission_url")]
    MissingKey { publisher: Publisher, log: String },

    #[error("{publisher} lists log '{key}' more than once")]
    DuplicateKey { publisher: Publisher, key: String },
}
