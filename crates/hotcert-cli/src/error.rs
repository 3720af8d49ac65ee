use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum CliError {
    #[error("Failed to write the configuration file: {0}")]
    Write(#[from] std::io::Error),

    #[error("{0}")]
    Hotcert(#[from] hotcert::error::ReloadError),

    #[error("{0}")]
    Generic(String),
}
