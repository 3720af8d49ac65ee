// Domain name normalization and wildcard matching for SNI lookups

use std::{borrow::Borrow, fmt::Display};

/// Prefix marking a wildcard key, e.g. `*.example.com`
pub const WILDCARD_PREFIX: &str = "*.";

/// Canonicalize a raw domain name: trim whitespace, drop one trailing root dot, lowercase.
///
/// Normalizing an already normalized name returns it unchanged.
pub fn normalize_domain(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    trimmed.to_lowercase()
}

/// A normalized domain name used as a key in the certificate store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainKey(String);

impl DomainKey {
    pub fn new(raw: &str) -> Self {
        DomainKey(normalize_domain(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key is a wildcard pattern (`*.suffix`)
    pub fn is_wildcard(&self) -> bool {
        self.0.starts_with(WILDCARD_PREFIX)
    }

    /// The part of a wildcard key after the `*`, including the leading dot.
    pub fn wildcard_suffix(&self) -> Option<&str> {
        if self.is_wildcard() {
            Some(&self.0[1..])
        } else {
            None
        }
    }

    /// Checks if a normalized name is covered by this wildcard key.
    ///
    /// `*.example.com` matches `a.example.com` and `a.b.example.com` but not `example.com`.
    pub fn wildcard_matches(&self, name: &str) -> bool {
        self.wildcard_suffix()
            .is_some_and(|suffix| name.len() > suffix.len() && name.ends_with(suffix))
    }
}

impl From<&str> for DomainKey {
    fn from(raw: &str) -> Self {
        DomainKey::new(raw)
    }
}

impl From<String> for DomainKey {
    fn from(raw: String) -> Self {
        DomainKey::new(&raw)
    }
}

impl AsRef<str> for DomainKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets maps keyed by `DomainKey` be queried with an already normalized `&str`
impl Borrow<str> for DomainKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Display for DomainKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_whitespace_dot_and_case() {
        assert_eq!(normalize_domain("Domain.Com. "), "domain.com");
        assert_eq!(normalize_domain(" domain.com "), "domain.com");
        assert_eq!(normalize_domain("DOMAIN.COM"), "domain.com");
    }

    #[test]
    fn test_normalize_only_one_trailing_dot() {
        assert_eq!(normalize_domain("domain.com.."), "domain.com.");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_domain(""), "");
        assert_eq!(normalize_domain("  .  "), "");
    }

    #[test]
    fn test_wildcard_suffix() {
        assert_eq!(DomainKey::new("*.Example.com").wildcard_suffix(), Some(".example.com"));
        assert_eq!(DomainKey::new("example.com").wildcard_suffix(), None);
    }

    #[test]
    fn test_wildcard_does_not_match_bare_suffix() {
        let key = DomainKey::new("*.example.com");
        assert!(!key.wildcard_matches("example.com"));
        assert!(!key.wildcard_matches(".example.com"));
        assert!(key.wildcard_matches("a.example.com"));
    }
}
