// Reload surface handed to whatever decides that certificates should change

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use log::{debug, error, info, warn};
use tokio::task::JoinHandle;

use crate::{
    config::Config,
    error::ReloadError,
    tls::{CertificateStore, DomainKey, HandshakeResolver, KeyPairSource, load_key_pair},
};

/// Outcome of applying a full configuration to the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    /// Whether the default certificate was replaced
    pub default_updated: bool,

    /// Number of domain keys inserted or replaced
    pub updated: usize,

    /// Number of domain keys dropped because they are no longer configured
    pub removed: usize,
}

/// Cheap, cloneable handle for updating and removing certificates at runtime.
///
/// Every clone talks to the same [`CertificateStore`], so it can be moved into signal handlers,
/// timers or admin endpoints while the server keeps resolving handshakes from the store.
#[derive(Debug, Clone)]
pub struct Reloader {
    store: Arc<CertificateStore>,
}

impl Reloader {
    /// Create a reloader whose store starts with the default certificate from `source`
    pub fn new(source: &KeyPairSource) -> Result<Self, ReloadError> {
        let store = CertificateStore::new(source)?;
        Ok(Self::with_store(Arc::new(store)))
    }

    pub fn with_store(store: Arc<CertificateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<CertificateStore> {
        &self.store
    }

    /// A handshake resolver reading from the same store
    pub fn resolver(&self) -> HandshakeResolver {
        HandshakeResolver::new(Arc::clone(&self.store))
    }

    /// Update or add the certificate for `domains`, or the default certificate when `domains`
    /// is empty. Wildcard domains use the `*.` prefix, e.g. `*.example.com`.
    pub fn update_certificate<S: AsRef<str>>(
        &self,
        source: &KeyPairSource,
        domains: &[S],
    ) -> Result<(), ReloadError> {
        self.store.update(source, domains).inspect_err(|e| {
            error!("Failed to load certificate from {}: {e}", source.describe());
        })
    }

    /// Stop serving the certificate registered for `domain`
    pub fn remove_certificate(&self, domain: &str) -> Result<(), ReloadError> {
        self.store.remove(domain).inspect_err(|e| {
            warn!("{e}");
        })
    }

    /// Make the store match `config`.
    ///
    /// Every key pair is loaded before anything is published; if one fails the store keeps its
    /// current certificates. The default certificate is replaced when configured (and kept
    /// otherwise), configured domains are inserted or replaced, and domains that are no longer
    /// configured are removed, all inside one write section.
    pub fn apply_config(&self, config: &Config) -> Result<ReloadSummary, ReloadError> {
        config.validate()?;

        let default = config
            .default_certificate
            .as_ref()
            .map(|cert| load_key_pair(&cert.source()))
            .transpose()?;

        let mut entries = Vec::new();
        for entry in &config.certificates {
            let cert = load_key_pair(&entry.certificate.source())?;
            entries.extend(
                entry
                    .domains
                    .iter()
                    .map(|domain| (DomainKey::new(domain), Arc::clone(&cert))),
            );
        }

        let configured: HashSet<&DomainKey> = entries.iter().map(|(key, _)| key).collect();
        let stale: Vec<DomainKey> = self
            .store
            .domains()
            .into_iter()
            .filter(|key| !configured.contains(key))
            .collect();

        let summary = ReloadSummary {
            default_updated: default.is_some(),
            updated: entries.len(),
            removed: 0,
        };

        let removed = self.store.apply(default, entries, &stale);
        let summary = ReloadSummary { removed, ..summary };

        info!(
            "Applied certificate configuration: default updated: {}, {} domain(s) updated, {} removed",
            summary.default_updated, summary.updated, summary.removed
        );

        Ok(summary)
    }

    /// Re-read a TOML config file and apply it
    #[cfg(feature = "toml")]
    pub fn reload_from_file(&self, path: &Path) -> Result<ReloadSummary, ReloadError> {
        debug!("Reloading certificates from {}", path.display());
        let config = Config::load(path)?;
        self.apply_config(&config)
    }
}

/// Reload certificates from `config_path` every time the process receives SIGHUP.
///
/// A failed reload is logged and the previous certificates stay active.
#[cfg(all(unix, feature = "toml"))]
pub fn watch_sighup(
    reloader: Reloader,
    config_path: PathBuf,
) -> Result<JoinHandle<()>, ReloadError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangups = signal(SignalKind::hangup()).map_err(|e| {
        ReloadError::GenericError(format!("Failed to install SIGHUP handler: {e}"))
    })?;

    debug!("Watching for SIGHUP to reload {}", config_path.display());

    Ok(tokio::spawn(async move {
        while hangups.recv().await.is_some() {
            info!("Received SIGHUP, reloading certificates");
            if let Err(e) = reloader.reload_from_file(&config_path) {
                error!("Certificate reload failed, keeping current certificates: {e}");
            }
        }
    }))
}

/// Rotate the default certificate through `sources`, one step every `interval`.
///
/// Sources that fail to load are skipped and logged; the loop continues with the next one.
pub fn rotate_every(
    reloader: Reloader,
    interval: Duration,
    sources: Vec<KeyPairSource>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if sources.is_empty() {
            warn!("No certificates to rotate through");
            return;
        }

        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        for source in sources.iter().cycle() {
            ticker.tick().await;
            info!("Rotating default certificate to {}", source.describe());
            let _ = reloader.update_certificate(source, &[] as &[&str]);
        }
    })
}

#[cfg(all(test, feature = "toml"))]
mod tests {
    use super::*;

    #[test]
    fn test_reload_from_missing_file_is_error() {
        let reloader = Reloader::with_store(Arc::new(CertificateStore::empty()));
        let result = reloader.reload_from_file(Path::new("/nonexistent/hotcert.toml"));
        assert!(matches!(result, Err(ReloadError::ConfigError { .. })));
        assert!(reloader.store().is_empty());
    }
}
