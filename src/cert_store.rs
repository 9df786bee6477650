// src/cert_store.rs
//! Content-addressed storage for root certificates.

use anyhow::{Context, Result};
use base64::Engine;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::debug;

use crate::cert_parser::CertificateParser;

const PEM_HEADER: &str = "-----BEGIN CERTIFICATE-----";
const PEM_FOOTER: &str = "-----END CERTIFICATE-----";
const PEM_LINE_WIDTH: usize = 64;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Result of storing one certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRoot {
    pub fingerprint: String,
    /// False when a file for this fingerprint already existed
    pub newly_written: bool,
}

/// Stores PEM files named `<sha256-hex>.pem` in a single directory.
///
/// Files are only ever added. Writes go through a uniquely named temporary
/// file and a rename, so concurrent puts of the same bytes leave one intact
/// file behind.
#[derive(Debug, Clone)]
pub struct CertificateStore {
    dir: PathBuf,
}

impl CertificateStore {
    /// Open the store, creating its directory if needed
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create certificate directory {:?}", dir))?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(format!("{}.pem", fingerprint))
    }

    /// Store the certificate and return its fingerprint
    pub async fn put(&self, der_bytes: &[u8]) -> Result<String> {
        Ok(self.insert(der_bytes).await?.fingerprint)
    }

    /// Store the certificate, reporting whether a new file was written
    pub async fn insert(&self, der_bytes: &[u8]) -> Result<StoredRoot> {
        let fingerprint = CertificateParser::fingerprint(der_bytes);
        let path = self.path_for(&fingerprint);

        if fs::try_exists(&path)
            .await
            .with_context(|| format!("Failed to check {:?}", path))?
        {
            return Ok(StoredRoot {
                fingerprint,
                newly_written: false,
            });
        }

        let temp_path = self.dir.join(format!(
            ".{}.{}.{}.tmp",
            fingerprint,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        fs::write(&temp_path, pem_encode(der_bytes))
            .await
            .with_context(|| format!("Failed to write temporary certificate {:?}", temp_path))?;

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e).with_context(|| format!("Failed to move certificate into {:?}", path));
        }

        debug!("Stored new root {}", fingerprint);

        Ok(StoredRoot {
            fingerprint,
            newly_written: true,
        })
    }

    /// Read a stored certificate back as DER
    pub async fn get(&self, fingerprint: &str) -> Result<Vec<u8>> {
        let path = self.path_for(fingerprint);
        let pem = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?;
        pem_decode(&pem)
    }
}

/// PEM-armor DER bytes with a 64-column base64 body
pub fn pem_encode(der_bytes: &[u8]) -> String {
    let body = base64::engine::general_purpose::STANDARD.encode(der_bytes);

    let mut pem = String::with_capacity(body.len() + body.len() / PEM_LINE_WIDTH + 64);
    pem.push_str(PEM_HEADER);
    pem.push('\n');
    for line in body.as_bytes().chunks(PEM_LINE_WIDTH) {
        pem.push_str(&String::from_utf8_lossy(line));
        pem.push('\n');
    }
    pem.push_str(PEM_FOOTER);
    pem.push('\n');
    pem
}

/// Decode the body of a single PEM certificate back to DER
pub fn pem_decode(pem: &str) -> Result<Vec<u8>> {
    let body: String = pem
        .lines()
        .map(str::trim)
        .skip_while(|line| *line != PEM_HEADER)
        .skip(1)
        .take_while(|line| *line != PEM_FOOTER)
        .collect();

    base64::engine::general_purpose::STANDARD
        .decode(body)
        .context("Failed to decode PEM body")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_der() -> Vec<u8> {
        (0..=255u8).cycle().take(700).collect()
    }

    #[test]
    fn test_pem_layout() {
        let pem = pem_encode(&sample_der());
        let lines: Vec<&str> = pem.lines().collect();

        assert_eq!(lines.first(), Some(&PEM_HEADER));
        assert_eq!(lines.last(), Some(&PEM_FOOTER));
        let body = &lines[1..lines.len() - 1];
        assert!(body[..body.len() - 1].iter().all(|l| l.len() == 64));
        assert!(body[body.len() - 1].len() <= 64);
        assert!(pem.ends_with("-----END CERTIFICATE-----\n"));
    }

    #[test]
    fn test_pem_round_trip() {
        let der = sample_der();
        assert_eq!(pem_decode(&pem_encode(&der)).unwrap(), der);
    }

    #[tokio::test]
    async fn test_put_returns_fingerprint() {
        let dir = TempDir::new().unwrap();
        let store = CertificateStore::open(dir.path()).await.unwrap();

        let der = sample_der();
        let fp = store.put(&der).await.unwrap();
        assert_eq!(fp, CertificateParser::fingerprint(&der));
        assert_eq!(store.get(&fp).await.unwrap(), der);
    }

    #[tokio::test]
    async fn test_put_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = CertificateStore::open(dir.path()).await.unwrap();
        let der = sample_der();

        let first = store.insert(&der).await.unwrap();
        let second = store.insert(&der).await.unwrap();

        assert!(first.newly_written);
        assert!(!second.newly_written);
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_puts_same_bytes() {
        let dir = TempDir::new().unwrap();
        let store = CertificateStore::open(dir.path()).await.unwrap();
        let der = sample_der();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let der = der.clone();
                tokio::spawn(async move { store.put(&der).await.unwrap() })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), CertificateParser::fingerprint(&der));
        }

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        let fp = CertificateParser::fingerprint(&der);
        assert_eq!(store.get(&fp).await.unwrap(), der);
    }
}
