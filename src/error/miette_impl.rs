//! Miette integration for pretty error reporting.

use std::fmt::Display;

use miette::{Diagnostic, Severity};
use thiserror::Error;

use super::LoaderError;

/// A diagnostic wrapper for loader errors compatible with miette.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct LoaderDiagnostic {
    /// The error message
    pub message: String,

    #[source]
    /// The underlying error source
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,

    /// Help text for the user
    pub help: Option<String>,

    /// Severity level
    pub severity: Severity,
}

impl Diagnostic for LoaderDiagnostic {
    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.help
            .as_deref()
            .map(|help| Box::new(help) as Box<dyn Display + 'a>)
    }

    fn severity(&self) -> Option<Severity> {
        Some(self.severity)
    }
}

impl From<LoaderError> for LoaderDiagnostic {
    fn from(e: LoaderError) -> Self {
        let message = e.to_string();
        let (help, severity) = match &e {
            LoaderError::Disposed => (
                "The loader's owning scope was disposed; build a new loader",
                Severity::Error,
            ),
            LoaderError::WrongThread { .. } => (
                "Call the loader from the thread that built it, or use AffinityPolicy::AnyThread",
                Severity::Error,
            ),
            LoaderError::Construction { .. } => (
                "The provider factory failed; nothing was cached for this number",
                Severity::Warning,
            ),
            LoaderError::Scope(_) => (
                "Register listeners against a scope that is still alive",
                Severity::Error,
            ),
            LoaderError::RecursiveConstruction { .. } => (
                "A provider factory must not request its own number from the same loader",
                Severity::Error,
            ),
            LoaderError::InvalidOption(_) => ("Check the loader configuration", Severity::Error),
            LoaderError::Config(_) => (
                "Check the loader configuration file and its values",
                Severity::Error,
            ),
        };
        let source = match e {
            LoaderError::Construction { source, .. } => Some(source),
            LoaderError::Scope(scope) => {
                Some(Box::new(scope) as Box<dyn std::error::Error + Send + Sync>)
            }
            LoaderError::Config(config) => {
                Some(Box::new(config) as Box<dyn std::error::Error + Send + Sync>)
            }
            _ => None,
        };

        LoaderDiagnostic {
            message,
            source,
            help: Some(help.into()),
            severity,
        }
    }
}

impl From<LoaderError> for miette::Report {
    fn from(e: LoaderError) -> Self {
        miette::Report::new(LoaderDiagnostic::from(e))
    }
}
