// TLS module: certificate loading, the hot-swappable certificate store and SNI resolution

pub mod acceptor;
pub mod domain;
pub mod loader;
pub mod resolver;
pub mod store;

pub use domain::{DomainKey, normalize_domain};
pub use loader::{KeyPairSource, load_key_pair};
pub use resolver::HandshakeResolver;
pub use store::CertificateStore;

/// Install the aws-lc-rs crypto provider as the process default if none is installed yet
pub fn install_default_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}
