//! Configuration for data loaders.
//!
//! This module provides:
//! - `LoaderConfig`: Serde-deserialized loader settings
//! - `ConfigFormat`: The text formats a config can be read from
//! - `ConfigError`: Errors raised while reading or validating a config

mod format;
mod loader_config;

pub use format::ConfigFormat;
pub use loader_config::LoaderConfig;

use thiserror::Error;

/// Errors that can occur while reading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No known format matches the file's extension
    #[error("Unknown config format for '{0}'")]
    UnknownFormat(String),

    /// Format feature not enabled
    #[error("Config format '{0}' is not enabled. Enable the corresponding feature.")]
    NotEnabled(ConfigFormat),

    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Deserialization error
    #[error("Parse error: {0}")]
    Parse(Box<dyn std::error::Error + Send + Sync>),

    /// A field holds a value the loader cannot use
    #[error("Invalid value '{value}' for '{field}'")]
    InvalidValue { field: &'static str, value: String },
}
