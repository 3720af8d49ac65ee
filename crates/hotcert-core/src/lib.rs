//! Hot-swappable TLS certificates for rustls servers.
//!
//! A [`tls::CertificateStore`] holds a default certificate plus per-domain certificates
//! (exact names and `*.` wildcards). A [`tls::HandshakeResolver`] picks a certificate from the
//! store on every handshake, while a [`reload::Reloader`] updates or removes certificates from
//! anywhere else in the program without restarting the listener.

pub mod config;
pub mod error;
pub mod reload;
pub mod server;
pub mod tls;
