// src/config.rs

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_apple_url")]
    pub apple_url: String,
    #[serde(default = "default_google_url")]
    pub google_url: String,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_apple_url() -> String {
    "https://valid.apple.com/ct/log_list/current_log_list.json".to_string()
}
fn default_google_url() -> String {
    "https://www.gstatic.com/ct/log_list/v3/all_logs_list.json".to_string()
}
fn default_fetch_timeout() -> u64 { 30 }

impl SourcesConfig {
    pub fn apple_path(&self) -> PathBuf {
        self.data_dir.join("apple").join("current_log_list.json")
    }

    pub fn google_path(&self) -> PathBuf {
        self.data_dir.join("google").join("all_log_list.json")
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            apple_url: default_apple_url(),
            google_url: default_google_url(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

/// What to do with logs that neither publisher gives a state (test logs)
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatelessLogPolicy {
    #[default]
    Skip,
    Include,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HarvestConfig {
    #[serde(default = "default_cert_dir")]
    pub cert_dir: PathBuf,
    #[serde(default = "default_manifest_dir")]
    pub manifest_dir: PathBuf,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default)]
    pub stateless_logs: StatelessLogPolicy,
}

fn default_cert_dir() -> PathBuf { PathBuf::from("data/roots/certs") }
fn default_manifest_dir() -> PathBuf { PathBuf::from("data/roots/logs") }
fn default_timeout() -> u64 { 5 }
fn default_max_concurrent() -> usize { 8 }

impl HarvestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            cert_dir: default_cert_dir(),
            manifest_dir: default_manifest_dir(),
            timeout_secs: default_timeout(),
            max_concurrent: default_max_concurrent(),
            stateless_logs: StatelessLogPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_merged_output")]
    pub merged_output: PathBuf,
}

fn default_merged_output() -> PathBuf { PathBuf::from("data/merged_logs.json") }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            merged_output: default_merged_output(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `path` if it exists, otherwise fall back to built-in defaults
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.harvest.timeout_secs == 0 {
            anyhow::bail!("harvest.timeout_secs must be greater than 0");
        }
        if self.harvest.max_concurrent == 0 {
            anyhow::bail!("harvest.max_concurrent must be greater than 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_config_from_valid_toml() {
        let temp_file = write_config(
            r#"
[sources]
data_dir = "cache"
google_url = "https://example.com/google.json"

[harvest]
cert_dir = "out/certs"
manifest_dir = "out/logs"
timeout_secs = 3
max_concurrent = 2
stateless_logs = "include"

[output]
merged_output = "out/merged.json"

[logging]
level = "debug"
        "#,
        );

        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.sources.data_dir, PathBuf::from("cache"));
        assert_eq!(config.sources.google_url, "https://example.com/google.json");
        assert_eq!(config.sources.apple_url, default_apple_url());
        assert_eq!(
            config.sources.apple_path(),
            PathBuf::from("cache/apple/current_log_list.json")
        );
        assert_eq!(config.harvest.timeout(), Duration::from_secs(3));
        assert_eq!(config.harvest.max_concurrent, 2);
        assert_eq!(config.harvest.stateless_logs, StatelessLogPolicy::Include);
        assert_eq!(config.output.merged_output, PathBuf::from("out/merged.json"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_config_empty_uses_defaults() {
        let temp_file = write_config("");
        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.harvest.timeout_secs, 5);
        assert_eq!(config.harvest.max_concurrent, 8);
        assert_eq!(config.harvest.stateless_logs, StatelessLogPolicy::Skip);
        assert_eq!(config.logging.level, "info");
        assert_eq!(
            config.sources.google_path(),
            PathBuf::from("data/google/all_log_list.json")
        );
    }

    #[test]
    fn test_config_invalid_toml() {
        let temp_file = write_config("invalid toml content {{{");
        assert!(Config::from_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_config_unknown_policy() {
        let temp_file = write_config("[harvest]\nstateless_logs = \"sometimes\"\n");
        assert!(Config::from_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_config_zero_workers_rejected() {
        let temp_file = write_config("[harvest]\nmax_concurrent = 0\n");
        assert!(Config::from_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_config_nonexistent_file() {
        let result = Config::from_file(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config.harvest.timeout_secs, 5);
    }
}
