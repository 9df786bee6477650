// src/ct_log/client.rs
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::types::GetRootsResponse;

/// HTTP client for the RFC 6962 get-roots endpoint of one CT log
pub struct CtLogClient {
    base_url: Url,
    http_client: reqwest::Client,
}

impl CtLogClient {
    /// Create a client for the log at `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .context("Failed to build HTTP client")?;

        Self::with_client(base_url, http_client)
    }

    /// Create a client sharing an existing connection pool
    pub fn with_client(base_url: &str, http_client: reqwest::Client) -> Result<Self> {
        // Url::join replaces the last path segment unless the base ends in '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)
            .with_context(|| format!("Invalid log URL '{}'", base_url))?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the accepted root certificates, still base64-encoded
    /// Endpoint: GET {base_url}/ct/v1/get-roots
    pub async fn get_roots(&self) -> Result<Vec<String>> {
        let url = self
            .base_url
            .join("ct/v1/get-roots")
            .context("Failed to build get-roots URL")?;

        debug!("Fetching roots from {}", url);

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .context("Failed to fetch roots")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "get-roots request failed with status {}",
                response.status()
            );
        }

        let roots: GetRootsResponse = response
            .json()
            .await
            .context("Failed to parse get-roots JSON")?;

        debug!(
            "Received {} roots from {}",
            roots.certificates.len(),
            self.base_url
        );

        Ok(roots.certificates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client =
            CtLogClient::new("https://ct.example.com/logs/a", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url().as_str(), "https://ct.example.com/logs/a/");
        assert_eq!(
            client.base_url().join("ct/v1/get-roots").unwrap().as_str(),
            "https://ct.example.com/logs/a/ct/v1/get-roots"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(CtLogClient::new("not a url", Duration::from_secs(5)).is_err());
    }
}
