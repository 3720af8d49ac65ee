use std::sync::Arc;

use hotcert::error::ReloadError;
use hotcert::tls::{CertificateStore, HandshakeResolver, KeyPairSource};
use rustls::sign::CertifiedKey;

const CERT1: &str = include_str!("fixtures/cert1.pem");
const KEY1: &str = include_str!("fixtures/key1.pem");
const CERT2: &str = include_str!("fixtures/cert2.pem");
const KEY2: &str = include_str!("fixtures/key2.pem");

// Initialize crypto provider for tests
fn init_crypto() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

fn leaf(cert: &CertifiedKey) -> Vec<u8> {
    cert.cert[0].as_ref().to_vec()
}

fn resolver_with_default() -> HandshakeResolver {
    init_crypto();
    let store = CertificateStore::new(&KeyPairSource::pem(CERT1, KEY1)).unwrap();
    HandshakeResolver::new(Arc::new(store))
}

#[test]
fn test_default_only_store_serves_default_for_any_name() {
    let resolver = resolver_with_default();
    let default = resolver.store().default_certificate().unwrap();

    assert!(resolver.store().lookup("anything.tld").is_none());

    let cert = resolver.resolve_for_handshake("anything.tld").unwrap();
    assert!(Arc::ptr_eq(&cert, &default));
}

#[test]
fn test_missing_sni_falls_back_to_default() {
    let resolver = resolver_with_default();
    assert!(resolver.resolve_for_handshake("").is_ok());
}

#[test]
fn test_empty_store_is_not_loaded() {
    let resolver = HandshakeResolver::new(Arc::new(CertificateStore::empty()));

    let result = resolver.resolve_for_handshake("anything.tld");
    assert!(matches!(
        result,
        Err(ReloadError::CertificateNotLoaded { ref server_name }) if server_name == "anything.tld"
    ));
}

#[test]
fn test_domain_certificate_preferred_over_default() {
    let resolver = resolver_with_default();
    resolver
        .store()
        .update(&KeyPairSource::pem(CERT2, KEY2), &["domain.com"])
        .unwrap();

    let default = resolver.store().default_certificate().unwrap();
    let domain_cert = resolver.resolve_for_handshake("DomaIn.Com").unwrap();
    let other = resolver.resolve_for_handshake("domain.net").unwrap();

    assert_ne!(leaf(&domain_cert), leaf(&default));
    assert!(Arc::ptr_eq(&other, &default));
}

#[test]
fn test_domains_without_default_are_not_loaded_when_unmatched() {
    init_crypto();
    let store = CertificateStore::empty();
    store
        .update(&KeyPairSource::pem(CERT1, KEY1), &["*.wildcarddomain.com"])
        .unwrap();
    let resolver = HandshakeResolver::new(Arc::new(store));

    assert!(resolver.resolve_for_handshake("static.www.wildcarddomain.com").is_ok());
    assert!(matches!(
        resolver.resolve_for_handshake("wildcarddomain.com"),
        Err(ReloadError::CertificateNotLoaded { .. })
    ));
}

#[test]
fn test_resolver_sees_updates_made_after_creation() {
    init_crypto();
    let store = Arc::new(CertificateStore::empty());
    let resolver = HandshakeResolver::new(Arc::clone(&store));
    assert!(resolver.resolve_for_handshake("a.com").is_err());

    store
        .update(&KeyPairSource::pem(CERT1, KEY1), &["a.com"])
        .unwrap();
    assert!(resolver.resolve_for_handshake("a.com").is_ok());

    store.remove("a.com").unwrap();
    assert!(resolver.resolve_for_handshake("a.com").is_err());
}
