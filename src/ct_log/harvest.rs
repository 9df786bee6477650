// src/ct_log/harvest.rs
use anyhow::{Context, Result};
use base64::Engine;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::client::CtLogClient;
use super::types::{LogRootManifest, MergedLogRecord, STATE_REJECTED};
use crate::cert_parser::CertificateParser;
use crate::cert_store::CertificateStore;
use crate::config::{HarvestConfig, StatelessLogPolicy};
use crate::progress::ProgressIndicator;
use crate::stats::HarvestStats;

/// Hex digits of the URL digest appended to each manifest name
const MANIFEST_DIGEST_LEN: usize = 12;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Why a merged log is or is not harvested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    /// Validity window closed before the reference time
    Expired,
    Rejected,
    NoState,
    NoUrl,
}

/// Decide whether a merged log should have its roots harvested
pub fn eligibility(
    record: &MergedLogRecord,
    now: DateTime<Utc>,
    stateless_logs: StatelessLogPolicy,
) -> Eligibility {
    if record.canonical_key().is_none() {
        return Eligibility::NoUrl;
    }

    if let Some(end) = record.end() {
        match DateTime::parse_from_rfc3339(end) {
            Ok(end) if end < now => return Eligibility::Expired,
            Ok(_) => {}
            Err(e) => warn!(
                "{}: unparseable end '{}' ({}), treating log as open",
                record.canonical_key().unwrap_or_default(),
                end,
                e
            ),
        }
    }

    match record.state() {
        Some(STATE_REJECTED) => Eligibility::Rejected,
        Some(_) => Eligibility::Eligible,
        None if stateless_logs == StatelessLogPolicy::Include => Eligibility::Eligible,
        None => Eligibility::NoState,
    }
}

/// Manifest file name for a log.
///
/// The readable part is the URL without scheme, unsafe characters as '_'.
/// That part alone can collide (`a_b/` vs `a/b`), so a digest of the full
/// URL is appended.
pub fn manifest_file_name(log_url: &str) -> String {
    let without_scheme = log_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(log_url)
        .trim_end_matches('/');

    let mut name: String = without_scheme
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.is_empty() || name.starts_with('.') {
        name.insert(0, '_');
    }

    let digest = hex::encode(Sha256::digest(log_url.as_bytes()));
    format!("{}-{}.json", name, &digest[..MANIFEST_DIGEST_LEN])
}

/// Outcome of one harvest run
#[derive(Debug, Default)]
pub struct HarvestReport {
    pub harvested: Vec<String>,
    pub failed: Vec<(String, String)>,
    /// Eligible logs skipped because the run was cancelled
    pub not_attempted: Vec<String>,
}

enum LogOutcome {
    Harvested(String),
    Failed(String, String),
    NotAttempted(String),
}

/// Fetches and stores the accepted roots of every eligible log
pub struct RootHarvester {
    config: HarvestConfig,
    store: CertificateStore,
    http_client: reqwest::Client,
    stats: HarvestStats,
    progress: ProgressIndicator,
}

impl RootHarvester {
    pub async fn new(config: HarvestConfig) -> Result<Self> {
        let store = CertificateStore::open(&config.cert_dir).await?;

        fs::create_dir_all(&config.manifest_dir).await.with_context(|| {
            format!("Failed to create manifest directory {:?}", config.manifest_dir)
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            store,
            http_client,
            stats: HarvestStats::new(),
            progress: ProgressIndicator::new(false),
        })
    }

    pub fn with_progress(mut self, progress: ProgressIndicator) -> Self {
        self.progress = progress;
        self
    }

    pub fn stats(&self) -> &HarvestStats {
        &self.stats
    }

    pub fn manifest_path(&self, log_url: &str) -> PathBuf {
        self.config.manifest_dir.join(manifest_file_name(log_url))
    }

    /// Harvest every eligible log once.
    ///
    /// Per-log failures are logged and reported, never propagated. Once
    /// `shutdown` flips to true no further logs are started.
    pub async fn run(
        &self,
        records: impl IntoIterator<Item = MergedLogRecord>,
        now: DateTime<Utc>,
        shutdown: watch::Receiver<bool>,
    ) -> HarvestReport {
        let mut targets = Vec::new();
        for record in records {
            match eligibility(&record, now, self.config.stateless_logs) {
                Eligibility::Eligible => {
                    if let Some(key) = record.canonical_key() {
                        targets.push(key.to_string());
                    }
                }
                reason => {
                    debug!(
                        "Skipping {}: {:?}",
                        record.canonical_key().unwrap_or("<no url>"),
                        reason
                    );
                    self.stats.increment_ineligible();
                }
            }
        }

        info!(
            "Harvesting roots from {} eligible CT logs ({} workers)",
            targets.len(),
            self.config.max_concurrent
        );
        self.progress.set_length(targets.len() as u64);

        let outcomes: Vec<LogOutcome> = stream::iter(targets)
            .map(|log_url| {
                let shutdown = shutdown.clone();
                async move {
                    if *shutdown.borrow() {
                        self.stats.increment_not_attempted();
                        return LogOutcome::NotAttempted(log_url);
                    }

                    let outcome = match self.harvest_log(&log_url).await {
                        Ok(manifest) => {
                            debug!("{}: {} roots", log_url, manifest.fingerprints.len());
                            self.stats.increment_harvested();
                            LogOutcome::Harvested(log_url)
                        }
                        Err(e) => {
                            warn!("Failed to harvest roots from {}: {:#}", log_url, e);
                            self.stats.increment_failed();
                            LogOutcome::Failed(log_url, format!("{:#}", e))
                        }
                    };

                    self.progress.inc();
                    self.progress.set_message(self.stats.format_stats());
                    outcome
                }
            })
            .buffer_unordered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        self.progress.finish();

        let mut report = HarvestReport::default();
        for outcome in outcomes {
            match outcome {
                LogOutcome::Harvested(url) => report.harvested.push(url),
                LogOutcome::Failed(url, error) => report.failed.push((url, error)),
                LogOutcome::NotAttempted(url) => report.not_attempted.push(url),
            }
        }
        report.harvested.sort();
        report.failed.sort();
        report.not_attempted.sort();

        if !report.not_attempted.is_empty() {
            warn!(
                "Harvest cancelled: {} logs not attempted",
                report.not_attempted.len()
            );
        }

        report
    }

    /// Fetch, store and record the roots of one log
    pub async fn harvest_log(&self, log_url: &str) -> Result<LogRootManifest> {
        let client = CtLogClient::with_client(log_url, self.http_client.clone())?;
        let encoded_roots = client.get_roots().await?;

        let mut fingerprints = Vec::with_capacity(encoded_roots.len());
        for (i, encoded) in encoded_roots.iter().enumerate() {
            let der = base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .with_context(|| format!("Failed to decode root #{}", i))?;

            let stored = self.store.insert(&der).await?;
            self.stats.record_root(stored.newly_written);

            let summary = CertificateParser::summarize(&der);
            debug!(
                "{}: root {} ({}, expires {})",
                log_url,
                stored.fingerprint,
                summary.subject.as_deref().unwrap_or("unparseable"),
                summary
                    .not_after
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "unknown".to_string())
            );

            fingerprints.push(stored.fingerprint);
        }

        let manifest = LogRootManifest::from_fingerprints(fingerprints);
        write_manifest(&self.manifest_path(log_url), &manifest).await?;

        Ok(manifest)
    }
}

/// Overwrite a manifest through a temporary file and rename
async fn write_manifest(path: &Path, manifest: &LogRootManifest) -> Result<()> {
    let mut contents =
        serde_json::to_string_pretty(manifest).context("Failed to serialize manifest")?;
    contents.push('\n');

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    fs::write(&temp_path, contents)
        .await
        .with_context(|| format!("Failed to write manifest to {:?}", temp_path))?;

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e).with_context(|| format!("Failed to rename manifest into {:?}", path));
    }

    Ok(())
}
