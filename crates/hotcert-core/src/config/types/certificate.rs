use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::tls::KeyPairSource;

/// A certificate chain and private key stored as PEM files.
///
/// # Example
/// ```
/// use hotcert::config::Certificate;
///
/// let cert = Certificate::new("./certs/cert.pem", "./certs/key.pem");
/// assert_eq!(cert.cert_path().to_str(), Some("./certs/cert.pem"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Path to the certificate chain PEM file
    pub cert: PathBuf,

    /// Path to the private key PEM file
    pub key: PathBuf,
}

impl Certificate {
    pub fn new(cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        Self {
            cert: cert.into(),
            key: key.into(),
        }
    }

    pub fn cert_path(&self) -> &Path {
        &self.cert
    }

    pub fn key_path(&self) -> &Path {
        &self.key
    }

    /// Resolve relative paths against `base` (usually the config file's directory)
    pub fn relative_to(&self, base: &Path) -> Self {
        Self {
            cert: base.join(&self.cert),
            key: base.join(&self.key),
        }
    }

    /// The loader input for this certificate
    pub fn source(&self) -> KeyPairSource {
        KeyPairSource::files(&self.cert, &self.key)
    }
}

/// A certificate served for one or more domains (exact names or `*.` wildcards)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCertificate {
    #[serde(flatten)]
    pub certificate: Certificate,

    /// Domains this certificate is selected for
    pub domains: Vec<String>,
}

impl DomainCertificate {
    pub fn new(certificate: Certificate, domains: Vec<String>) -> Self {
        Self {
            certificate,
            domains,
        }
    }
}
