// Certificate selection on the TLS handshake path

use std::sync::Arc;

use log::{trace, warn};
use rustls::{
    server::{ClientHello, ResolvesServerCert},
    sign::CertifiedKey,
};

use crate::error::ReloadError;

use super::store::CertificateStore;

/// Selects the certificate for each incoming handshake from a shared [`CertificateStore`].
///
/// Register it with `ServerConfig::with_cert_resolver`; every handshake then sees the
/// certificates as they are at that moment, including ones swapped in after the listener
/// started.
#[derive(Debug, Clone)]
pub struct HandshakeResolver {
    store: Arc<CertificateStore>,
}

impl HandshakeResolver {
    pub fn new(store: Arc<CertificateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<CertificateStore> {
        &self.store
    }

    /// Pick the certificate for `server_name`: a per-domain match, else the default.
    ///
    /// `server_name` is empty when the client did not send SNI. Only the store's read lock is
    /// taken.
    pub fn resolve_for_handshake(
        &self,
        server_name: &str,
    ) -> Result<Arc<CertifiedKey>, ReloadError> {
        self.store
            .lookup_or_default(server_name)
            .ok_or_else(|| ReloadError::CertificateNotLoaded {
                server_name: server_name.to_string(),
            })
    }
}

impl ResolvesServerCert for HandshakeResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        let server_name = client_hello.server_name().unwrap_or_default();
        trace!("Resolving certificate for SNI `{server_name}`");

        // rustls aborts the handshake when no certificate is returned
        match self.resolve_for_handshake(server_name) {
            Ok(cert) => Some(cert),
            Err(e) => {
                warn!("Rejecting handshake: {e}");
                None
            }
        }
    }
}
