use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReloadError {
    #[error("Invalid certificate file `{path}`: {message}")]
    InvalidCertificateFile { path: String, message: String },

    #[error("Invalid private key file `{path}`: {message}")]
    InvalidPrivateKeyFile { path: String, message: String },

    #[error("No certificates found in `{path}`")]
    EmptyCertificateChain { path: String },

    #[error("Unsupported private key: {0}")]
    UnsupportedPrivateKey(String),

    #[error("Private key `{path}` does not match the leaf certificate")]
    KeyMismatch { path: String },

    #[error("Certificate for domain `{domain}` is not found")]
    CertificateNotFound { domain: String },

    #[error("No certificate is loaded for server name `{server_name}`")]
    CertificateNotLoaded { server_name: String },

    #[error("Error in `{field}`: {message}")]
    ConfigError { field: String, message: String },

    #[error("Failed to parse `{field}`: {message}")]
    ParseError { field: String, message: String },

    #[error("Invalid port `{port}`, ports up to 1024 are reserved")]
    InvalidPortRange { port: u16 },

    #[error("Failed to bind to the specified address, reason: {0:?}")]
    FailedToBind(std::io::Error),

    #[error("Failed to accept connection, reason: {0:?}")]
    FailedToAcceptConnection(std::io::Error),

    #[error("Timed out waiting for open connections to close")]
    TimeoutWaitingForConnections,

    #[error("TLS initialization failed: {0}")]
    TlsInitializationFailed(String),

    #[error("{0}")]
    GenericError(String),
}

impl ReloadError {
    /// Whether the error came from loading certificate or key material.
    ///
    /// A failed load never changes the certificate store, so callers can retry with corrected
    /// material.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            ReloadError::InvalidCertificateFile { .. }
                | ReloadError::InvalidPrivateKeyFile { .. }
                | ReloadError::EmptyCertificateChain { .. }
                | ReloadError::UnsupportedPrivateKey(_)
                | ReloadError::KeyMismatch { .. }
        )
    }
}
