use crate::error::ReloadError;

use super::{Config, Format};

#[derive(Default)]
pub struct Toml<'a> {
    input: &'a str,
}

impl<'a> Toml<'a> {
    pub fn new(input: &'a str) -> Self {
        Toml { input }
    }
}

impl<'a> From<&'a str> for Toml<'a> {
    fn from(input: &'a str) -> Self {
        Toml::new(input)
    }
}

impl<'a> Format<'a> for Toml<'a> {
    fn from_str(input: &'a str) -> Self {
        Toml::new(input)
    }

    fn to_format_string(&self, config: &Config) -> Result<String, ReloadError> {
        toml::to_string(config).map_err(|e| {
            ReloadError::GenericError(format!("Failed to convert config to TOML string: {e}"))
        })
    }

    fn parse(&self) -> Result<Config, ReloadError> {
        toml::from_str(self.input).map_err(|e| ReloadError::ParseError {
            field: "root".to_string(),
            message: format!("Failed to parse TOML configuration: {e}"),
        })
    }

    fn extension(&self) -> &'static str {
        "toml"
    }
}
