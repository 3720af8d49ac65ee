// TLS acceptor creation around the hot-swappable resolver

use std::sync::Arc;

use rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

use crate::error::ReloadError;

use super::resolver::HandshakeResolver;

/// ALPN protocols advertised by the built-in server
pub const DEFAULT_ALPN_PROTOCOLS: &[&[u8]] = &[b"http/1.1"];

/// Build a rustls server config that asks `resolver` for a certificate on every handshake
pub fn build_server_config(resolver: HandshakeResolver) -> ServerConfig {
    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_cert_resolver(Arc::new(resolver));

    config.alpn_protocols = DEFAULT_ALPN_PROTOCOLS.iter().map(|p| p.to_vec()).collect();
    config
}

/// Build a TLS acceptor backed by a [`HandshakeResolver`].
///
/// An empty store is rejected here because every handshake would fail; certificates may still
/// be added or replaced through the store after the acceptor is built.
pub fn build_tls_acceptor(resolver: HandshakeResolver) -> Result<TlsAcceptor, ReloadError> {
    if resolver.store().is_empty() {
        return Err(ReloadError::TlsInitializationFailed(
            "No certificates configured".to_string(),
        ));
    }

    let config = build_server_config(resolver);
    Ok(TlsAcceptor::from(Arc::new(config)))
}
