//! Loader configuration read from a config file.

use std::path::Path;

use serde::Deserialize;

use super::{ConfigError, ConfigFormat};
use crate::affinity::AffinityPolicy;

/// Configuration for a single data loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderConfig {
    /// Name used in logs and in the loader's scope name
    #[serde(default)]
    pub name: Option<String>,
    /// Upper bound on cached providers; absent means unbounded
    #[serde(default)]
    pub max_cached: Option<usize>,
    /// Thread affinity policy: "error", "panic" or "any"
    #[serde(default)]
    pub thread_affinity: Option<String>,
}

impl LoaderConfig {
    /// Create a new empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from text in the given format.
    pub fn parse(format: ConfigFormat, text: &str) -> Result<Self, ConfigError> {
        format.parse(text)
    }

    /// Read a configuration file, picking the format from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let format = ConfigFormat::from_extension(ext)
            .ok_or_else(|| ConfigError::UnknownFormat(path.display().to_string()))?;

        let text = std::fs::read_to_string(path)?;
        format.parse(&text)
    }

    /// Set the loader name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the cache bound.
    pub fn with_max_cached(mut self, max: usize) -> Self {
        self.max_cached = Some(max);
        self
    }

    /// Set the thread affinity policy.
    pub fn with_thread_affinity(mut self, policy: impl Into<String>) -> Self {
        self.thread_affinity = Some(policy.into());
        self
    }

    /// Resolve `thread_affinity`, defaulting to `AffinityPolicy::Error`.
    pub fn affinity_policy(&self) -> Result<AffinityPolicy, ConfigError> {
        match self.thread_affinity.as_deref() {
            None => Ok(AffinityPolicy::default()),
            Some(raw) => AffinityPolicy::from_str(raw).ok_or_else(|| ConfigError::InvalidValue {
                field: "thread_affinity",
                value: raw.to_string(),
            }),
        }
    }

    /// Check the values that serde alone cannot reject.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_cached == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_cached",
                value: "0".to_string(),
            });
        }
        self.affinity_policy().map(|_| ())
    }
}
