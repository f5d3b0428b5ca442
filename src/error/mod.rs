//! Error types for loader and scope operations.
//!
//! This module provides:
//! - `LoaderError`: Errors returned by `DataLoader` operations
//! - `ScopeError`: Errors returned when registering against a `Disposable`
//! - `BoxError`: The boxed error type produced by provider factories

use std::thread::ThreadId;

use thiserror::Error;

use crate::PrNumber;
use crate::config::ConfigError;

/// Boxed error returned by a provider factory.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by a `Disposable` scope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// Something tried to attach itself to a scope that has already ended
    #[error("scope '{name}' is already disposed")]
    AlreadyDisposed { name: String },
}

/// Errors raised by `DataLoader` operations.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The loader was torn down; no further operations are valid
    #[error("data loader is already disposed")]
    Disposed,

    /// An operation was called outside the loader's designated thread
    #[error("`{operation}` called from thread {actual:?}, but the loader is bound to {expected:?}")]
    WrongThread {
        operation: &'static str,
        expected: ThreadId,
        actual: ThreadId,
    },

    /// The provider factory failed; `source` is the factory's own error
    #[error("failed to create data provider for #{number}: {source}")]
    Construction {
        number: PrNumber,
        #[source]
        source: BoxError,
    },

    /// The factory for `number` asked the same loader for `number` again
    #[error("data provider for #{number} requested while it is being created on the same thread")]
    RecursiveConstruction { number: PrNumber },

    /// A listener or child registration was rejected by its scope
    #[error(transparent)]
    Scope(#[from] ScopeError),

    /// The builder was given an option it cannot honor
    #[error("invalid loader option: {0}")]
    InvalidOption(String),

    /// The loader configuration could not be read or applied
    #[error("invalid loader configuration: {0}")]
    Config(#[from] ConfigError),
}

impl LoaderError {
    /// Check if this error reports use of a torn-down loader.
    pub fn is_disposed(&self) -> bool {
        matches!(self, LoaderError::Disposed)
    }

    /// Take the factory error out of a `Construction` error.
    ///
    /// Returns `Err(self)` for every other variant.
    pub fn into_construction_source(self) -> Result<BoxError, Self> {
        match self {
            LoaderError::Construction { source, .. } => Ok(source),
            other => Err(other),
        }
    }
}

#[cfg(feature = "miette")]
mod miette_impl;

#[cfg(feature = "miette")]
pub use miette_impl::*;
