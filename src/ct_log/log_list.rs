// src/ct_log/log_list.rs
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

use super::types::{LogListDocument, Publisher};
use crate::config::SourcesConfig;

/// Top-level fields Google bumps daily without any log changing
const GOOGLE_VOLATILE_FIELDS: [&str; 2] = ["version", "log_list_timestamp"];

/// Downloads the publisher log lists into the local cache
pub struct LogListFetcher {
    http_client: reqwest::Client,
}

impl LogListFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { http_client })
    }

    /// Fetch one publisher's raw log list
    pub async fn fetch_raw(&self, publisher: Publisher, list_url: &str) -> Result<Value> {
        info!("Fetching {} CT log list from {}", publisher, list_url);

        let response = self
            .http_client
            .get(list_url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {} log list", publisher))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Failed to fetch {} log list: HTTP {}",
                publisher,
                response.status()
            );
        }

        let mut document: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} log list JSON", publisher))?;

        if publisher == Publisher::Google {
            strip_volatile_fields(&mut document);
        }

        Ok(document)
    }

    /// Fetch both lists and overwrite the cached copies
    pub async fn refresh_cache(&self, sources: &SourcesConfig) -> Result<()> {
        let apple = self.fetch_raw(Publisher::Apple, &sources.apple_url).await?;
        let google = self.fetch_raw(Publisher::Google, &sources.google_url).await?;

        save_document(&sources.apple_path(), &apple).await?;
        save_document(&sources.google_path(), &google).await?;

        info!("Log list cache refreshed in {:?}", sources.data_dir);
        Ok(())
    }
}

/// Drop Google's version and timestamp so unchanged lists compare equal
pub fn strip_volatile_fields(document: &mut Value) {
    if let Some(obj) = document.as_object_mut() {
        for field in GOOGLE_VOLATILE_FIELDS {
            obj.remove(field);
        }
    }
}

/// Write a document pretty-printed with a trailing newline
pub async fn save_document(path: &Path, document: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }

    let mut contents =
        serde_json::to_string_pretty(document).context("Failed to serialize log list")?;
    contents.push('\n');

    fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write {:?}", path))?;

    debug!("Saved log list to {:?}", path);
    Ok(())
}

/// Read and parse one cached log list
pub async fn load_document(path: &Path) -> Result<LogListDocument> {
    let contents = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read log list {:?}", path))?;

    let document: LogListDocument = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse log list {:?}", path))?;

    debug!(
        "Loaded {} operators from {:?}",
        document.operators.len(),
        path
    );

    Ok(document)
}
