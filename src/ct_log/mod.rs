// src/ct_log/mod.rs
pub mod client;
pub mod flatten;
pub mod harvest;
pub mod log_list;
pub mod merge;
pub mod types;

pub use client::CtLogClient;
pub use flatten::{flatten_logs, log_name};
pub use harvest::{HarvestReport, RootHarvester};
pub use log_list::LogListFetcher;
pub use merge::{merge_log_lists, merge_state};
pub use types::{LogListDocument, LogRecord, LogRootManifest, MergedLogRecord, Publisher};
