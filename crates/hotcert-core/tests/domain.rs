use hotcert::tls::{DomainKey, normalize_domain};

#[test]
fn test_normalize_domain_is_case_space_and_dot_insensitive() {
    assert_eq!(normalize_domain("Domain.Com. "), normalize_domain("domain.com"));
    assert_eq!(normalize_domain(" DomaIn.Com "), "domain.com");
    assert_eq!(normalize_domain("\tdomain.com.\n"), "domain.com");
}

#[test]
fn test_normalize_domain_is_idempotent() {
    for raw in [
        "Domain.Com. ",
        " *.WildcardDomain.com ",
        "a.b.c.",
        "",
        "xn--bcher-kva.example.",
    ] {
        let once = normalize_domain(raw);
        assert_eq!(normalize_domain(&once), once, "not idempotent for {raw:?}");
    }
}

#[test]
fn test_domain_key_equality_after_normalization() {
    assert_eq!(DomainKey::new("Example.COM."), DomainKey::new(" example.com"));
    assert_ne!(DomainKey::new("example.com"), DomainKey::new("example.net"));
}

#[test]
fn test_wildcard_key_matches_subdomains_only() {
    let key = DomainKey::new("*.example.com");
    assert!(key.is_wildcard());
    assert!(key.wildcard_matches("a.example.com"));
    assert!(key.wildcard_matches("x.y.example.com"));
    assert!(!key.wildcard_matches("example.com"));
    assert!(!key.wildcard_matches("badexample.com"));
    assert!(!key.wildcard_matches("a.example.net"));
}

#[test]
fn test_exact_key_never_wildcard_matches() {
    let key = DomainKey::new("example.com");
    assert!(!key.is_wildcard());
    assert!(!key.wildcard_matches("a.example.com"));
}
