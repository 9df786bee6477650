// src/cert_parser.rs
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use x509_parser::prelude::*;

/// Descriptive metadata for a root certificate, used in diagnostics only
#[derive(Debug, Clone, Default)]
pub struct RootSummary {
    pub subject: Option<String>,
    pub not_after: Option<DateTime<Utc>>,
}

/// Certificate parser for root certificates served by CT logs
pub struct CertificateParser;

impl CertificateParser {
    /// Hex SHA-256 over the exact DER bytes
    pub fn fingerprint(der_bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(der_bytes);
        hex::encode(hasher.finalize())
    }

    /// Summarize a DER certificate.
    ///
    /// Roots that fail X.509 parsing get an empty summary; the stored bytes
    /// are never rejected on parse grounds.
    pub fn summarize(der_bytes: &[u8]) -> RootSummary {
        match X509Certificate::from_der(der_bytes) {
            Ok((_, cert)) => RootSummary {
                subject: Self::extract_subject(&cert),
                not_after: DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0),
            },
            Err(_) => RootSummary::default(),
        }
    }

    /// Subject CN, or the full subject DN when there is no CN
    fn extract_subject(cert: &X509Certificate) -> Option<String> {
        cert.subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_string)
            .or_else(|| Some(cert.subject().to_string()))
    }
}
