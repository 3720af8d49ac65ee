use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use hotcert::{
    config::{Certificate, Config, DomainCertificate, LogLevel},
    reload::{ReloadSummary, Reloader},
    server::Server,
    tls::{self, CertificateStore},
};
use log::{debug, info, warn};

use crate::{error::CliError, format::FormatType};

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the server and reload certificates on SIGHUP
    Run {
        /// Path to the configuration file
        #[arg(short, long, default_value = "hotcert.toml")]
        config: PathBuf,
    },

    /// Load every certificate in the configuration file without serving anything
    Check {
        /// Path to the configuration file
        #[arg(short, long, default_value = "hotcert.toml")]
        config: PathBuf,
    },

    /// Create a new hotcert configuration file in the target directory
    Init {
        /// The path to the target directory where the configuration file will be created
        #[arg(required = false)]
        target_dir: Option<PathBuf>,

        /// The format of the configuration file
        #[arg(short, long, value_enum, default_value_t = FormatType::Toml)]
        format: FormatType,
    },

    /// Print the version of the hotcert CLI
    Version,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, default_value = "info")]
    /// The log level for the application
    log_level: Option<LogLevel>,

    #[clap(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn new() -> Self {
        let cli = Cli::parse();

        // NOTE: the CLI flag always wins over `log_level` in the configuration file
        let level = cli.log_level.unwrap_or_default().to_log_level_filter();
        env_logger::Builder::new().filter_level(level).init();

        cli
    }

    pub async fn execute(&self) -> Result<(), CliError> {
        match &self.command {
            Commands::Run { config } => run(config).await,
            Commands::Check { config } => {
                let summary = check(config)?;
                println!(
                    "{}: default certificate: {}, {} domain(s) ok",
                    config.display(),
                    if summary.default_updated { "ok" } else { "none" },
                    summary.updated
                );
                Ok(())
            }
            Commands::Init { target_dir, format } => {
                let target_dir = match target_dir {
                    Some(dir) => dir.clone(),
                    None => std::env::current_dir()?,
                };
                let path = init(&target_dir, *format)?;
                println!("Created {}", path.display());
                Ok(())
            }
            Commands::Version => {
                println!("hotcert {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

async fn run(config_path: &Path) -> Result<(), CliError> {
    tls::install_default_provider();

    let config = Config::load(config_path)?;
    if config.key_pair_count() == 0 {
        return Err(CliError::Generic(format!(
            "`{}` does not configure any certificates",
            config_path.display()
        )));
    }

    let server = Server::from_config(config)?;

    #[cfg(unix)]
    let _watcher = hotcert::reload::watch_sighup(server.reloader().clone(), config_path.into())?;

    info!("Serving certificates from {}", config_path.display());
    server.run().await?;
    Ok(())
}

/// Load and validate every key pair referenced by the config file
fn check(config_path: &Path) -> Result<ReloadSummary, CliError> {
    let config = Config::load(config_path)?;
    if config.key_pair_count() == 0 {
        warn!("`{}` does not configure any certificates", config_path.display());
    }

    let reloader = Reloader::with_store(std::sync::Arc::new(CertificateStore::empty()));
    Ok(reloader.apply_config(&config)?)
}

/// Write a sample configuration into `target_dir`, refusing to overwrite an existing file
fn init(target_dir: &Path, format: FormatType) -> Result<PathBuf, CliError> {
    let path = target_dir.join(format.file_name());
    if path.exists() {
        return Err(CliError::Generic(format!(
            "`{}` already exists",
            path.display()
        )));
    }

    let config = Config {
        default_certificate: Some(Certificate::new("certs/default.pem", "certs/default.key")),
        certificates: vec![DomainCertificate::new(
            Certificate::new("certs/example.pem", "certs/example.key"),
            vec!["example.com".to_string(), "*.example.com".to_string()],
        )],
        ..Config::default()
    };

    let contents = format.format("").to_format_string(&config)?;
    std::fs::create_dir_all(target_dir)?;
    std::fs::write(&path, contents)?;

    debug!("Wrote sample configuration to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CERT: &str = include_str!("../../hotcert-core/tests/fixtures/cert1.pem");
    const KEY: &str = include_str!("../../hotcert-core/tests/fixtures/key1.pem");

    #[test]
    fn test_init_writes_loadable_config() {
        let temp_dir = TempDir::new().unwrap();

        let path = init(temp_dir.path(), FormatType::Toml).unwrap();
        assert_eq!(path, temp_dir.path().join("hotcert.toml"));

        let config = Config::load(&path).unwrap();
        assert_eq!(config.key_pair_count(), 2);
        assert_eq!(
            config.default_certificate.unwrap().cert,
            temp_dir.path().join("certs/default.pem")
        );
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        init(temp_dir.path(), FormatType::Toml).unwrap();

        assert!(matches!(
            init(temp_dir.path(), FormatType::Toml),
            Err(CliError::Generic(_))
        ));
    }

    #[test]
    fn test_check_loads_every_pair() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("cert.pem"), CERT).unwrap();
        std::fs::write(temp_dir.path().join("key.pem"), KEY).unwrap();

        let config_path = temp_dir.path().join("hotcert.toml");
        std::fs::write(
            &config_path,
            r#"
[default_certificate]
cert = "cert.pem"
key = "key.pem"

[[certificates]]
cert = "cert.pem"
key = "key.pem"
domains = ["a.example", "*.b.example"]
"#,
        )
        .unwrap();

        let summary = check(&config_path).unwrap();
        assert!(summary.default_updated);
        assert_eq!(summary.updated, 2);
    }

    #[test]
    fn test_check_reports_missing_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = init(temp_dir.path(), FormatType::Toml).unwrap();

        assert!(matches!(check(&path), Err(CliError::Hotcert(_))));
    }
}
