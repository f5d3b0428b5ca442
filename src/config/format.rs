//! Config file formats.

use std::fmt;

use super::ConfigError;
use super::LoaderConfig;

/// Text formats a `LoaderConfig` can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigFormat {
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// TOML format
    Toml,
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFormat::Json => write!(f, "json"),
            ConfigFormat::Yaml => write!(f, "yaml"),
            ConfigFormat::Toml => write!(f, "toml"),
        }
    }
}

impl ConfigFormat {
    /// Parse a format from its name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Some(ConfigFormat::Json),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "toml" => Some(ConfigFormat::Toml),
            _ => None,
        }
    }

    /// Get file extensions for this format.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            ConfigFormat::Json => &["json"],
            ConfigFormat::Yaml => &["yaml", "yml"],
            ConfigFormat::Toml => &["toml"],
        }
    }

    /// Find the format whose extensions include `ext`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        [ConfigFormat::Json, ConfigFormat::Yaml, ConfigFormat::Toml]
            .into_iter()
            .find(|kind| kind.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Check if this format is available (feature enabled).
    pub fn is_available(&self) -> bool {
        match self {
            ConfigFormat::Json => cfg!(feature = "json"),
            ConfigFormat::Yaml => cfg!(feature = "yaml"),
            ConfigFormat::Toml => cfg!(feature = "toml"),
        }
    }

    /// Deserialize a `LoaderConfig` from `text`.
    pub fn parse(&self, text: &str) -> Result<LoaderConfig, ConfigError> {
        match self {
            #[cfg(feature = "json")]
            ConfigFormat::Json => {
                serde_json::from_str(text).map_err(|e| ConfigError::Parse(Box::new(e)))
            }

            #[cfg(feature = "yaml")]
            ConfigFormat::Yaml => {
                serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(Box::new(e)))
            }

            #[cfg(feature = "toml")]
            ConfigFormat::Toml => toml::from_str(text).map_err(|e| ConfigError::Parse(Box::new(e))),

            #[allow(unreachable_patterns)]
            _ => {
                let _ = text;
                Err(ConfigError::NotEnabled(*self))
            }
        }
    }
}
