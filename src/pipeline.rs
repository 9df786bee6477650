// src/pipeline.rs
//! Document -> flat records -> merged records, plus the merged-list output.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::config::SourcesConfig;
use crate::ct_log::log_list::load_document;
use crate::ct_log::{LogListDocument, LogRecord, MergedLogRecord, flatten_logs, merge_log_lists};
use crate::error::InputError;

/// Flatten both documents and merge them, ordered by canonical key
pub fn reconcile(
    apple: LogListDocument,
    google: LogListDocument,
) -> Result<Vec<MergedLogRecord>, InputError> {
    let apple: Vec<LogRecord> = flatten_logs(apple).collect::<Result<_, _>>()?;
    let google: Vec<LogRecord> = flatten_logs(google).collect::<Result<_, _>>()?;

    Ok(merge_log_lists(apple, google)?.collect())
}

/// Load both cached documents and reconcile them
pub async fn load_and_reconcile(sources: &SourcesConfig) -> Result<Vec<MergedLogRecord>> {
    let apple = load_document(&sources.apple_path()).await?;
    let google = load_document(&sources.google_path()).await?;

    let merged = reconcile(apple, google).context("Invalid CT log list")?;

    info!("Reconciled {} CT logs", merged.len());
    Ok(merged)
}

/// Write the merged list as a JSON array for the page renderer
pub async fn write_merged(path: &Path, records: &[MergedLogRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }

    let mut contents =
        serde_json::to_string_pretty(records).context("Failed to serialize merged logs")?;
    contents.push('\n');

    fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write merged logs to {:?}", path))?;

    info!("Wrote {} merged logs to {:?}", records.len(), path);
    Ok(())
}
