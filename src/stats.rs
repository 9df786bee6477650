// src/stats.rs
//! Counters for one root-harvesting run

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Thread-safe harvest counters, shared by all workers
#[derive(Clone)]
pub struct HarvestStats {
    ineligible: Arc<AtomicU64>,
    harvested: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
    not_attempted: Arc<AtomicU64>,
    roots_seen: Arc<AtomicU64>,
    new_roots: Arc<AtomicU64>,
    start_time: Instant,
}

/// Snapshot of statistics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub ineligible: u64,
    pub harvested: u64,
    pub failed: u64,
    pub not_attempted: u64,
    pub roots_seen: u64,
    pub new_roots: u64,
    pub elapsed_secs: u64,
}

impl HarvestStats {
    pub fn new() -> Self {
        Self {
            ineligible: Arc::new(AtomicU64::new(0)),
            harvested: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
            not_attempted: Arc::new(AtomicU64::new(0)),
            roots_seen: Arc::new(AtomicU64::new(0)),
            new_roots: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn increment_ineligible(&self) {
        self.ineligible.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_harvested(&self) {
        self.harvested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_not_attempted(&self) {
        self.not_attempted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one root served by a log, and whether it was new to the store
    pub fn record_root(&self, newly_written: bool) {
        self.roots_seen.fetch_add(1, Ordering::Relaxed);
        if newly_written {
            self.new_roots.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            ineligible: self.ineligible.load(Ordering::Relaxed),
            harvested: self.harvested.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            not_attempted: self.not_attempted.load(Ordering::Relaxed),
            roots_seen: self.roots_seen.load(Ordering::Relaxed),
            new_roots: self.new_roots.load(Ordering::Relaxed),
            elapsed_secs: self.start_time.elapsed().as_secs(),
        }
    }

    /// One-line progress message
    pub fn format_stats(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            "{} harvested | {} failed | {} roots ({} new)",
            snapshot.harvested, snapshot.failed, snapshot.roots_seen, snapshot.new_roots
        )
    }

    /// Format elapsed duration
    pub fn format_elapsed(secs: u64) -> String {
        let minutes = secs / 60;
        let seconds = secs % 60;

        if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

impl Default for HarvestStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let snapshot = HarvestStats::new().snapshot();
        assert_eq!(snapshot.harvested, 0);
        assert_eq!(snapshot.roots_seen, 0);
    }

    #[test]
    fn test_record_root() {
        let stats = HarvestStats::new();
        stats.record_root(true);
        stats.record_root(false);
        stats.record_root(false);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.roots_seen, 3);
        assert_eq!(snapshot.new_roots, 1);
    }

    #[test]
    fn test_clone_shares_state() {
        let stats1 = HarvestStats::new();
        let stats2 = stats1.clone();

        stats1.increment_harvested();
        stats2.increment_failed();

        let snapshot = stats1.snapshot();
        assert_eq!(snapshot.harvested, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(stats1.format_stats(), "1 harvested | 1 failed | 0 roots (0 new)");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(HarvestStats::format_elapsed(30), "30s");
        assert_eq!(HarvestStats::format_elapsed(90), "1m 30s");
    }
}
