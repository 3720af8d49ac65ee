use clap::ValueEnum;
use hotcert::config::{Format, toml};
use serde::Serialize;

#[derive(ValueEnum, Clone, Copy, Default, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatType {
    /// TOML format
    #[default]
    Toml,
}

impl FormatType {
    /// Get the associated format for the type
    pub fn format<'a>(&self, input: &'a str) -> Box<dyn Format<'a> + 'a> {
        match self {
            FormatType::Toml => Box::new(toml::Toml::from(input)),
        }
    }

    /// File name used by `init` for this format
    pub fn file_name(&self) -> String {
        format!("hotcert.{}", self.format("").extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(FormatType::Toml.file_name(), "hotcert.toml");
    }
}
