//! # prloader
//!
//! A registry of lazily constructed data providers, one per pull-request
//! number, with scoped invalidation listeners and disposable lifetimes.
//!
//! ## Overview
//!
//! prloader provides:
//! - **Lazy caching**: `DataLoader::get_data_provider` builds a provider on first
//!   request and returns the same instance until it is invalidated
//! - **Invalidation**: drop one or every cached provider; listeners hear about
//!   each dropped number
//! - **Scoped lifetimes**: listeners, providers and the loader itself are bound
//!   to `Disposable` scopes and released exactly once
//! - **Thread affinity**: a loader is bound to the thread that built it, with a
//!   configurable `AffinityPolicy`
//! - **Configuration**: `LoaderConfig` can be read from JSON, YAML or TOML files
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use prloader::{Disposable, LoaderBuilder, provider::from_fn};
//!
//! struct PullRequest {
//!     number: i64,
//! }
//!
//! let project = Disposable::named("project");
//! let loader = LoaderBuilder::new(from_fn(|number| {
//!     Ok::<_, std::io::Error>(PullRequest { number })
//! }))
//! .with_parent(&project)
//! .build()
//! .unwrap();
//!
//! let first = loader.get_data_provider(1).unwrap();
//! assert!(Arc::ptr_eq(&first, &loader.get_data_provider(1).unwrap()));
//! assert_eq!(first.number, 1);
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let panel = Disposable::named("panel");
//! let sink = seen.clone();
//! loader
//!     .add_invalidation_listener(&panel, move |number| sink.lock().unwrap().push(number))
//!     .unwrap();
//!
//! loader.invalidate_all_data().unwrap();
//! assert_eq!(*seen.lock().unwrap(), vec![1]);
//!
//! project.dispose();
//! assert!(matches!(loader.get_data_provider(1), Err(e) if e.is_disposed()));
//! ```
//!
//! ## Features
//!
//! - `json` - JSON config files
//! - `yaml` - YAML config files (enabled by default)
//! - `toml` - TOML config files
//! - `miette` - Pretty error reporting with miette

pub mod affinity;
pub mod builder;
pub mod config;
pub mod disposable;
pub mod error;
pub mod events;
pub mod loader;
pub mod provider;

/// Number identifying one pull request.
pub type PrNumber = i64;

// Re-exports for convenience
pub use affinity::{AffinityPolicy, ThreadAffinity};
pub use builder::LoaderBuilder;
pub use config::{ConfigError, ConfigFormat, LoaderConfig};
pub use disposable::{Disposable, Registration};
pub use error::{BoxError, LoaderError, ScopeError};
pub use events::InvalidationListener;
pub use loader::DataLoader;
pub use provider::{FnFactory, ProviderFactory, from_fn};

/// Build a DataLoader from a LoaderConfig.
pub fn build_loader_from_config<P, F>(
    config: &LoaderConfig,
    factory: F,
) -> Result<DataLoader<P>, LoaderError>
where
    P: Send + Sync + 'static,
    F: ProviderFactory<P> + 'static,
{
    build_loader_from_config_with(config, factory, |builder| builder)
}

/// Build a DataLoader from a LoaderConfig, allowing the caller to further
/// customize the LoaderBuilder before it is built. This is the hook point for
/// attaching the loader to an owning scope.
pub fn build_loader_from_config_with<P, F, C>(
    config: &LoaderConfig,
    factory: F,
    customize: C,
) -> Result<DataLoader<P>, LoaderError>
where
    P: Send + Sync + 'static,
    F: ProviderFactory<P> + 'static,
    C: FnOnce(LoaderBuilder<P>) -> LoaderBuilder<P>,
{
    let builder = LoaderBuilder::from_config(config, factory)?;
    customize(builder).build()
}

#[cfg(feature = "miette")]
pub use error::LoaderDiagnostic;
