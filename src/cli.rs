// src/cli.rs
use chrono::{DateTime, Utc};
use clap::Parser;

/// ct-logsync: reconcile Apple's and Google's CT log lists
///
/// Merges both publishers' log lists into one record per log, then stores
/// the root certificates accepted by every live log.
#[derive(Parser, Debug, Clone)]
#[command(name = "ct-logsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    // ===== Input & Configuration =====
    /// Path to TOML config file (built-in defaults when absent)
    #[arg(short = 'c', long = "config", default_value = "config.toml")]
    pub config: String,

    /// Download fresh log lists into the cache before reconciling
    #[arg(short = 'f', long = "fetch")]
    pub fetch: bool,

    // ===== Harvesting =====
    /// Only reconcile the log lists; do not contact any CT log
    #[arg(long = "no-harvest")]
    pub no_harvest: bool,

    /// Reference time for log expiry (RFC 3339), defaults to now
    #[arg(long = "now", value_parser = parse_timestamp)]
    pub now: Option<DateTime<Utc>>,

    /// Also harvest logs that neither publisher assigns a state
    #[arg(long = "include-stateless-logs")]
    pub include_stateless_logs: bool,

    /// Override the number of logs fetched in parallel
    #[arg(long = "max-concurrent")]
    pub max_concurrent: Option<usize>,

    /// Disable progress bar
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    // ===== Logging =====
    /// Verbose logging (set log level to debug)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Quiet logging (set log level to warn)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp '{}': {}", s, e))
}

impl Cli {
    /// Validate flag combinations and return errors for invalid usage
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.verbose && self.quiet {
            anyhow::bail!("Cannot specify both --verbose and --quiet");
        }

        if self.max_concurrent == Some(0) {
            anyhow::bail!("--max-concurrent must be greater than 0");
        }

        Ok(())
    }

    /// Log level forced by flags, if any
    pub fn log_level(&self) -> Option<&str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("warn")
        } else {
            None
        }
    }

    pub fn should_show_progress(&self) -> bool {
        !self.no_progress && !self.no_harvest
    }
}
