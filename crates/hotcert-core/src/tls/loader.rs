// Certificate and private key loading from PEM files or in-memory PEM data

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, warn};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::sign::CertifiedKey;
use rustls_pemfile::{certs, private_key};

use crate::error::ReloadError;

/// Label used in error messages for in-memory PEM data
const MEMORY_SOURCE: &str = "<memory>";

/// Where a certificate chain and its private key are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPairSource {
    /// PEM files on disk
    Files { cert: PathBuf, key: PathBuf },

    /// PEM encoded bytes already in memory
    Pem { cert: Vec<u8>, key: Vec<u8> },
}

impl KeyPairSource {
    pub fn files(cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        KeyPairSource::Files {
            cert: cert.into(),
            key: key.into(),
        }
    }

    pub fn pem(cert: impl Into<Vec<u8>>, key: impl Into<Vec<u8>>) -> Self {
        KeyPairSource::Pem {
            cert: cert.into(),
            key: key.into(),
        }
    }

    /// A short human readable description, used in logs and errors
    pub fn describe(&self) -> String {
        match self {
            KeyPairSource::Files { cert, key } => {
                format!("{} + {}", cert.display(), key.display())
            }
            KeyPairSource::Pem { .. } => MEMORY_SOURCE.to_string(),
        }
    }
}

/// Validate that a certificate/key file path points at a readable regular file.
///
/// The path is canonicalized, which resolves symlinks and relative components and fails if the
/// file does not exist.
fn validate_cert_path(path: &Path, file_type: &str) -> Result<PathBuf, ReloadError> {
    let canonical = path.canonicalize().map_err(|e| {
        invalid_file_error(file_type, path, format!("Cannot access {file_type}: {e}"))
    })?;

    if !canonical.is_file() {
        return Err(invalid_file_error(
            file_type,
            path,
            format!("{file_type} path is not a file"),
        ));
    }

    Ok(canonical)
}

fn invalid_file_error(file_type: &str, path: &Path, message: String) -> ReloadError {
    let path = path.display().to_string();
    if file_type == "private key" {
        ReloadError::InvalidPrivateKeyFile { path, message }
    } else {
        ReloadError::InvalidCertificateFile { path, message }
    }
}

fn read_certificate_chain(
    reader: &mut dyn BufRead,
    origin: &str,
) -> Result<Vec<CertificateDer<'static>>, ReloadError> {
    let chain = certs(reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ReloadError::InvalidCertificateFile {
            path: origin.to_string(),
            message: format!("Failed to parse certificate: {e}"),
        })?;

    if chain.is_empty() {
        return Err(ReloadError::EmptyCertificateChain {
            path: origin.to_string(),
        });
    }

    Ok(chain)
}

fn read_private_key(
    reader: &mut dyn BufRead,
    origin: &str,
) -> Result<PrivateKeyDer<'static>, ReloadError> {
    private_key(reader)
        .map_err(|e| ReloadError::InvalidPrivateKeyFile {
            path: origin.to_string(),
            message: format!("Failed to parse private key: {e}"),
        })?
        .ok_or_else(|| ReloadError::InvalidPrivateKeyFile {
            path: origin.to_string(),
            message: "No private key found".to_string(),
        })
}

/// Load a certificate chain from a PEM file
pub fn load_certificate_chain(path: &Path) -> Result<Vec<CertificateDer<'static>>, ReloadError> {
    let safe_path = validate_cert_path(path, "certificate")?;

    let file = File::open(&safe_path).map_err(|e| ReloadError::InvalidCertificateFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut reader = BufReader::new(file);
    read_certificate_chain(&mut reader, &path.display().to_string())
}

/// Load a private key from a PEM file (PKCS#8, PKCS#1 or SEC1)
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, ReloadError> {
    let safe_path = validate_cert_path(path, "private key")?;

    let file = File::open(&safe_path).map_err(|e| ReloadError::InvalidPrivateKeyFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut reader = BufReader::new(file);
    return read_private_key(&mut reader, &path.display().to_string());
}

/// Parse a certificate chain from PEM bytes
pub fn parse_certificate_chain(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, ReloadError> {
    let mut reader = pem;
    read_certificate_chain(&mut reader, MEMORY_SOURCE)
}

/// Parse a private key from PEM bytes
pub fn parse_private_key(pem: &[u8]) -> Result<PrivateKeyDer<'static>, ReloadError> {
    let mut reader = pem;
    read_private_key(&mut reader, MEMORY_SOURCE)
}

/// Build a certified key from a parsed chain and key, checking that they belong together.
pub fn certified_key(
    chain: Vec<CertificateDer<'static>>,
    key: &PrivateKeyDer<'static>,
    key_origin: &str,
) -> Result<Arc<CertifiedKey>, ReloadError> {
    let signing_key = rustls::crypto::aws_lc_rs::sign::any_supported_type(key)
        .map_err(|e| ReloadError::UnsupportedPrivateKey(e.to_string()))?;

    let certified_key = CertifiedKey::new(chain, signing_key);

    match certified_key.keys_match() {
        Ok(()) => {}
        Err(rustls::Error::InconsistentKeys(rustls::InconsistentKeys::KeyMismatch)) => {
            return Err(ReloadError::KeyMismatch {
                path: key_origin.to_string(),
            });
        }
        // The signing key could not expose its public half; nothing left to compare against
        Err(e) => warn!("Unable to verify that `{key_origin}` matches its certificate: {e}"),
    }

    return Ok(Arc::new(certified_key));
}

/// Load a certificate chain and its private key into a shareable certified key.
///
/// Nothing here touches a certificate store, so a failing load has no side effects.
pub fn load_key_pair(source: &KeyPairSource) -> Result<Arc<CertifiedKey>, ReloadError> {
    debug!("Loading key pair from {}", source.describe());

    match source {
        KeyPairSource::Files { cert, key } => {
            let chain = load_certificate_chain(cert)?;
            let private_key = load_private_key(key)?;
            certified_key(chain, &private_key, &key.display().to_string())
        }
        KeyPairSource::Pem { cert, key } => {
            let chain = parse_certificate_chain(cert)?;
            let private_key = parse_private_key(key)?;
            certified_key(chain, &private_key, MEMORY_SOURCE)
        }
    }
}
