use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::Path,
};

use crate::{error::ReloadError, tls::DomainKey};

use super::{Certificate, DomainCertificate, LogLevel};

/// The core configuration options available
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The hostname or IP address to bind the server to (default: 0.0.0.0)
    #[serde(default = "Config::default_host")]
    pub host: IpAddr,

    /// The port number to bind the server to (default: 8443)
    #[serde(default = "Config::default_port")]
    pub port: u16,

    /// The log level to use (default: "info")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,

    /// Served when no domain specific certificate matches the requested server name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_certificate: Option<Certificate>,

    /// Certificates selected by server name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificates: Vec<DomainCertificate>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: Config::default_host(),
            port: Config::default_port(),
            log_level: Some(LogLevel::default()),
            default_certificate: None,
            certificates: Vec::new(),
        }
    }
}

impl Config {
    pub fn default_host() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0))
    }

    pub fn default_port() -> u16 {
        8443
    }

    /// Get the socket address for the server based on the configuration.
    pub fn socket_address(&self) -> Result<SocketAddr, ReloadError> {
        // Prevent the use of possibly reserved ports
        if self.port <= 1024 {
            return Err(ReloadError::InvalidPortRange { port: self.port });
        }

        Ok(SocketAddr::new(self.host, self.port))
    }

    /// Checks that the certificate entries can be applied unambiguously.
    ///
    /// Every entry needs at least one domain and a domain may only be claimed by one entry once
    /// normalized, otherwise which certificate wins would depend on file order.
    pub fn validate(&self) -> Result<(), ReloadError> {
        let mut seen: HashMap<DomainKey, usize> = HashMap::new();

        for (index, entry) in self.certificates.iter().enumerate() {
            if entry.domains.is_empty() {
                return Err(ReloadError::ConfigError {
                    field: format!("certificates[{index}].domains"),
                    message: "At least one domain is required".to_string(),
                });
            }

            for domain in &entry.domains {
                let key = DomainKey::new(domain);
                if key.as_str().is_empty() {
                    return Err(ReloadError::ConfigError {
                        field: format!("certificates[{index}].domains"),
                        message: "Domain names cannot be empty".to_string(),
                    });
                }

                if let Some(previous) = seen.insert(key.clone(), index) {
                    return Err(ReloadError::ConfigError {
                        field: format!("certificates[{index}].domains"),
                        message: format!(
                            "Domain `{key}` is already configured in certificates[{previous}]"
                        ),
                    });
                }
            }
        }

        Ok(())
    }

    /// Returns a copy with every certificate path resolved against `base`
    pub fn relative_to(&self, base: &Path) -> Self {
        Config {
            default_certificate: self
                .default_certificate
                .as_ref()
                .map(|cert| cert.relative_to(base)),
            certificates: self
                .certificates
                .iter()
                .map(|entry| {
                    DomainCertificate::new(
                        entry.certificate.relative_to(base),
                        entry.domains.clone(),
                    )
                })
                .collect(),
            ..self.clone()
        }
    }

    /// Total number of key pairs referenced by this configuration
    pub fn key_pair_count(&self) -> usize {
        self.certificates.len() + usize::from(self.default_certificate.is_some())
    }
}

#[cfg(feature = "toml")]
impl Config {
    /// Reads, parses and validates a TOML config file.
    ///
    /// Relative certificate paths are resolved against the file's directory, so reloading from
    /// a different working directory reads the same files.
    pub fn load(path: &Path) -> Result<Config, ReloadError> {
        use crate::config::{Format, toml::Toml};

        let input = std::fs::read_to_string(path).map_err(|e| ReloadError::ConfigError {
            field: "root".to_string(),
            message: format!("Failed to read `{}`: {e}", path.display()),
        })?;

        let config = Toml::from_str(&input).parse()?;
        config.validate()?;

        let base = path.parent().unwrap_or(Path::new("."));
        Ok(config.relative_to(base))
    }

    /// Writes the configuration as TOML
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ReloadError> {
        use crate::config::{Format, toml::Toml};

        let contents = Toml::default().to_format_string(self)?;
        std::fs::write(path.as_ref(), contents).map_err(|e| ReloadError::ConfigError {
            field: "root".to_string(),
            message: format!("Failed to write `{}`: {e}", path.as_ref().display()),
        })
    }
}
