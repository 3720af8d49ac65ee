// Concurrent certificate store shared by the handshake path and reload triggers

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use log::{debug, info};
use rustls::sign::CertifiedKey;

use crate::error::ReloadError;

use super::{
    domain::{DomainKey, normalize_domain},
    loader::{KeyPairSource, load_key_pair},
};

/// The data guarded by the store's lock
#[derive(Default)]
struct Certificates {
    default: Option<Arc<CertifiedKey>>,
    domains: HashMap<DomainKey, Arc<CertifiedKey>>,
}

impl Certificates {
    /// Finds the certificate for an already normalized name.
    ///
    /// An exact key always wins. Otherwise the wildcard key with the longest suffix is used, so
    /// `*.api.example.com` beats `*.example.com` for `v1.api.example.com`.
    fn find(&self, name: &str) -> Option<&Arc<CertifiedKey>> {
        if let Some(cert) = self.domains.get(name) {
            return Some(cert);
        }

        self.domains
            .iter()
            .filter(|(key, _)| key.wildcard_matches(name))
            .max_by_key(|(key, _)| key.as_str().len())
            .map(|(_, cert)| cert)
    }
}

/// Holds the active certificates: an optional default plus per-domain entries.
///
/// Lookups take the read lock only. Updates load key material before taking the write lock and
/// then swap `Arc`s, so the exclusive section never performs I/O and a handshake that already
/// obtained a certificate keeps using it after a rotation.
#[derive(Default)]
pub struct CertificateStore {
    inner: RwLock<Certificates>,
}

impl std::fmt::Debug for CertificateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateStore")
            .field("has_default", &self.has_default())
            .field("domains", &self.domains())
            .finish()
    }
}

impl CertificateStore {
    /// Create a store with no certificates at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a store whose default certificate is loaded from `source`.
    ///
    /// Fails if the initial key pair cannot be loaded.
    pub fn new(source: &KeyPairSource) -> Result<Self, ReloadError> {
        let store = Self::empty();
        store.update(source, &[] as &[&str])?;
        Ok(store)
    }

    fn read(&self) -> RwLockReadGuard<'_, Certificates> {
        // Writers only swap whole values, a poisoned lock still holds a consistent map
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Certificates> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load a key pair and publish it.
    ///
    /// With no domains the pair replaces the default certificate, otherwise it is stored under
    /// every given domain. The store is left untouched when loading fails.
    pub fn update<S: AsRef<str>>(
        &self,
        source: &KeyPairSource,
        domains: &[S],
    ) -> Result<(), ReloadError> {
        let cert = load_key_pair(source)?;
        self.publish(cert, domains);
        Ok(())
    }

    /// Publish an already loaded certificate, see [`CertificateStore::update`].
    ///
    /// All domains are inserted within one critical section, readers see either none or all
    /// of them.
    pub fn publish<S: AsRef<str>>(&self, cert: Arc<CertifiedKey>, domains: &[S]) {
        let keys: Vec<DomainKey> = domains
            .iter()
            .map(|domain| DomainKey::new(domain.as_ref()))
            .collect();

        let mut certificates = self.write();
        if keys.is_empty() {
            certificates.default = Some(cert);
            drop(certificates);
            info!("Default certificate updated");
            return;
        }

        for key in &keys {
            certificates.domains.insert(key.clone(), Arc::clone(&cert));
        }
        drop(certificates);

        let names: Vec<&str> = keys.iter().map(DomainKey::as_str).collect();
        info!("Certificate updated for domain(s): {names:?}");
    }

    /// Stop serving the certificate registered for `domain`.
    ///
    /// The default certificate can only be replaced, never removed.
    pub fn remove(&self, domain: &str) -> Result<(), ReloadError> {
        let key = DomainKey::new(domain);

        let removed = self.write().domains.remove(&key);
        match removed {
            Some(_) => {
                info!("Certificate removed for domain: {key}");
                Ok(())
            }
            None => Err(ReloadError::CertificateNotFound {
                domain: key.to_string(),
            }),
        }
    }

    /// Apply a batch of changes in a single critical section.
    ///
    /// `default` replaces the default certificate when present, `entries` are inserted or
    /// replaced and `removals` are dropped if registered. Returns the number of removed keys.
    pub fn apply(
        &self,
        default: Option<Arc<CertifiedKey>>,
        entries: Vec<(DomainKey, Arc<CertifiedKey>)>,
        removals: &[DomainKey],
    ) -> usize {
        let mut certificates = self.write();

        if let Some(cert) = default {
            certificates.default = Some(cert);
        }

        for (key, cert) in entries {
            certificates.domains.insert(key, cert);
        }

        removals
            .iter()
            .filter(|key| certificates.domains.remove(*key).is_some())
            .count()
    }

    /// Find the certificate registered for `domain`, exact keys first, then wildcards.
    ///
    /// Returns `None` when no per-domain certificate matches; the default is not consulted.
    pub fn lookup(&self, domain: &str) -> Option<Arc<CertifiedKey>> {
        let certificates = self.read();
        let name = normalize_domain(domain);
        let found = certificates.find(&name).cloned();

        if found.is_none() {
            debug!("No certificate registered for `{name}`");
        }

        found
    }

    /// Lookup with fallback to the default certificate, under a single read lock.
    pub fn lookup_or_default(&self, domain: &str) -> Option<Arc<CertifiedKey>> {
        let certificates = self.read();
        let name = normalize_domain(domain);
        certificates
            .find(&name)
            .or(certificates.default.as_ref())
            .cloned()
    }

    pub fn default_certificate(&self) -> Option<Arc<CertifiedKey>> {
        self.read().default.clone()
    }

    pub fn has_default(&self) -> bool {
        self.read().default.is_some()
    }

    /// Whether a certificate is registered under exactly this (normalized) key
    pub fn contains(&self, domain: &str) -> bool {
        self.read().domains.contains_key(&DomainKey::new(domain))
    }

    /// A sorted snapshot of the registered domain keys
    pub fn domains(&self) -> Vec<DomainKey> {
        let mut keys: Vec<DomainKey> = self.read().domains.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of per-domain entries, the default certificate is not counted
    pub fn len(&self) -> usize {
        self.read().domains.len()
    }

    /// True when neither a default nor any per-domain certificate is loaded
    pub fn is_empty(&self) -> bool {
        let certificates = self.read();
        certificates.default.is_none() && certificates.domains.is_empty()
    }
}
