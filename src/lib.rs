// src/lib.rs
// Library interface for ct-logsync
pub mod cert_parser;
pub mod cert_store;
pub mod cli;
pub mod config;
pub mod ct_log;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod stats;
