// src/ct_log/flatten.rs
//! Turns the operator -> logs nesting of a log list into flat per-log records.

use serde_json::Value;

use super::types::{Fields, LogListDocument, LogRecord, canonical_key};
use crate::error::InputError;

const NAME_SUFFIXES: [&str; 6] = ["CT Log", "CT log", "Log", "log", " ", "'"];
const NAME_PREFIXES: [&str; 5] = ["Nordu", "Up In The Air", "Symantec", " ", "'"];

/// Derive a short log name from its verbose description.
///
/// Each suffix candidate is stripped at most once, in order, then each prefix
/// candidate (the operator name first). Descriptions that reduce to nothing,
/// like "StartCom log", keep their original text.
pub fn log_name(operator: &str, description: &str) -> String {
    let mut name = description;

    for suffix in NAME_SUFFIXES {
        name = name.strip_suffix(suffix).unwrap_or(name);
    }
    for prefix in std::iter::once(operator).chain(NAME_PREFIXES) {
        name = name.strip_prefix(prefix).unwrap_or(name);
    }

    if name.is_empty() {
        description.to_string()
    } else {
        name.to_string()
    }
}

/// Flatten every log (regular and tiled) of every operator, in document order
pub fn flatten_logs(
    document: LogListDocument,
) -> impl Iterator<Item = Result<LogRecord, InputError>> {
    document.operators.into_iter().flat_map(|operator| {
        let name = operator.name;
        operator
            .logs
            .into_iter()
            .chain(operator.tiled_logs)
            .map(move |log| flatten_log(&name, log))
    })
}

fn flatten_log(operator: &str, mut log: Fields) -> Result<LogRecord, InputError> {
    let description = log
        .get("description")
        .and_then(Value::as_str)
        .ok_or_else(|| InputError::MissingDescription {
            operator: operator.to_string(),
        })?
        .to_string();
    let label = log_label(&log, &description);

    log.insert("operator".to_string(), Value::String(operator.to_string()));
    log.insert(
        "name".to_string(),
        Value::String(log_name(operator, &description)),
    );

    if let Some(state) = log.remove("state").filter(|s| !s.is_null()) {
        let (label_key, details) = state
            .as_object()
            .and_then(|s| s.iter().next())
            .map(|(k, v)| (k.clone(), v.clone()))
            .ok_or_else(|| InputError::EmptyState {
                operator: operator.to_string(),
                log: label.clone(),
            })?;

        let timestamp = details.get("timestamp").cloned().ok_or_else(|| {
            InputError::MissingStateTimestamp {
                operator: operator.to_string(),
                log: label.clone(),
                state: label_key.clone(),
            }
        })?;

        log.insert("state".to_string(), Value::String(label_key));
        log.insert("state_timestamp".to_string(), timestamp);
    }

    if let Some(interval) = log.remove("temporal_interval").filter(|i| !i.is_null()) {
        for (raw, field) in [("start_inclusive", "start"), ("end_exclusive", "end")] {
            let bound = interval.get(raw).cloned().ok_or_else(|| {
                InputError::MalformedInterval {
                    operator: operator.to_string(),
                    log: label.clone(),
                    field: raw,
                }
            })?;
            log.insert(field.to_string(), bound);
        }
    }

    Ok(LogRecord::new(log))
}

/// Identifies a log in diagnostics
fn log_label(log: &Fields, description: &str) -> String {
    canonical_key(log)
        .map(str::to_string)
        .unwrap_or_else(|| description.to_string())
}
