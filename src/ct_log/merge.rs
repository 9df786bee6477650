// src/ct_log/merge.rs
//! Field-level merge of the Apple and Google record sets.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use super::types::{
    Fields, LogRecord, MergedLogRecord, Publisher, STATE_PENDING, STATE_REJECTED, STATE_USABLE,
};
use crate::error::InputError;

/// Resolve two differing state labels into one.
///
/// Rejected wins over everything, then pending. When exactly one side says
/// usable, the other side wins since the log is evidently not usable
/// everywhere. Any other disagreement yields both labels concatenated.
pub fn merge_state(apple: &str, google: &str) -> String {
    if apple == STATE_REJECTED || google == STATE_REJECTED {
        return STATE_REJECTED.to_string();
    }
    if apple == STATE_PENDING || google == STATE_PENDING {
        return STATE_PENDING.to_string();
    }
    match (apple == STATE_USABLE, google == STATE_USABLE) {
        (true, false) => google.to_string(),
        (false, true) => apple.to_string(),
        _ => format!("{}{}", apple, google),
    }
}

/// Index records by canonical key, refusing missing or duplicate keys
pub fn index_by_key(
    publisher: Publisher,
    records: impl IntoIterator<Item = LogRecord>,
) -> Result<BTreeMap<String, LogRecord>, InputError> {
    let mut index = BTreeMap::new();

    for record in records {
        let key = match record.canonical_key() {
            Some(key) => key.to_string(),
            None => {
                return Err(InputError::MissingKey {
                    publisher,
                    log: record
                        .get_str("description")
                        .unwrap_or("<unnamed>")
                        .to_string(),
                });
            }
        };

        if index.contains_key(&key) {
            return Err(InputError::DuplicateKey { publisher, key });
        }
        index.insert(key, record);
    }

    Ok(index)
}

/// Merge the flattened Apple and Google lists into one record per log.
///
/// Both sides are indexed up front so key errors surface before any record
/// is produced; the merged records are then yielded in key order.
pub fn merge_log_lists(
    apple: impl IntoIterator<Item = LogRecord>,
    google: impl IntoIterator<Item = LogRecord>,
) -> Result<impl Iterator<Item = MergedLogRecord>, InputError> {
    let mut apple = index_by_key(Publisher::Apple, apple)?;
    let mut google = index_by_key(Publisher::Google, google)?;

    let keys: BTreeSet<String> = apple.keys().chain(google.keys()).cloned().collect();

    debug!(
        "Merging {} Apple and {} Google logs into {} entries",
        apple.len(),
        google.len(),
        keys.len()
    );

    Ok(keys
        .into_iter()
        .map(move |key| merge_log(apple.remove(&key), google.remove(&key))))
}

/// Merge the two records for one log; either side may be absent
pub fn merge_log(apple: Option<LogRecord>, google: Option<LogRecord>) -> MergedLogRecord {
    let apple_present = apple.is_some();
    let google_present = google.is_some();

    let mut fields = match (apple, google) {
        (Some(a), Some(g)) => {
            let label = log_label(&a, &g);
            merge_fields(&label, a.fields, g.fields)
        }
        (Some(only), None) | (None, Some(only)) => only.fields,
        (None, None) => Fields::new(),
    };

    fields.insert(
        Publisher::Apple.prefixed("present"),
        Value::Bool(apple_present),
    );
    fields.insert(
        Publisher::Google.prefixed("present"),
        Value::Bool(google_present),
    );

    MergedLogRecord { fields }
}

/// Identifier for diagnostics about a log both publishers list
fn log_label(apple: &LogRecord, google: &LogRecord) -> String {
    apple
        .canonical_key()
        .or_else(|| google.canonical_key())
        .unwrap_or("<unknown log>")
        .to_string()
}

fn merge_fields(label: &str, mut apple: Fields, mut google: Fields) -> Fields {
    let keys: BTreeSet<String> = apple.keys().chain(google.keys()).cloned().collect();
    let mut merged = Fields::new();

    for key in keys {
        let a = apple.remove(&key).filter(|v| !v.is_null());
        let g = google.remove(&key).filter(|v| !v.is_null());

        match (a, g) {
            (None, None) => {
                merged.insert(key, Value::Null);
            }
            (Some(value), None) | (None, Some(value)) => {
                merged.insert(key, value);
            }
            (Some(a), Some(g)) if a == g => {
                merged.insert(key, a);
            }
            (Some(_), Some(g)) if key == "name" => {
                merged.insert(key, g);
            }
            (Some(a), Some(g)) => {
                if key == "state" {
                    if let (Some(a_state), Some(g_state)) = (a.as_str(), g.as_str()) {
                        let state = merge_state(a_state, g_state);
                        if state != a_state && state != g_state {
                            warn!(
                                "Unresolved state conflict for {}: apple={} google={}",
                                label,
                                a_state,
                                g_state
                            );
                        }
                        merged.insert(key.clone(), Value::String(state));
                    }
                }
                merged.insert(Publisher::Apple.prefixed(&key), a);
                merged.insert(Publisher::Google.prefixed(&key), g);
            }
        }
    }

    merged
}
