//! Builder for creating DataLoader instances.

use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::affinity::AffinityPolicy;
use crate::config::{ConfigError, LoaderConfig};
use crate::disposable::Disposable;
use crate::error::LoaderError;
use crate::loader::DataLoader;
use crate::provider::ProviderFactory;

pub struct LoaderBuilder<P> {
    factory: Arc<dyn ProviderFactory<P>>,
    name: String,
    max_cached: Option<usize>,
    affinity: AffinityPolicy,
    parent: Option<Disposable>,
}

impl<P> std::fmt::Debug for LoaderBuilder<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderBuilder")
            .field("name", &self.name)
            .field("max_cached", &self.max_cached)
            .field("affinity", &self.affinity)
            .field("parent", &self.parent)
            .finish()
    }
}

impl<P> LoaderBuilder<P>
where
    P: Send + Sync + 'static,
{
    pub fn new<F>(factory: F) -> Self
    where
        F: ProviderFactory<P> + 'static,
    {
        Self::with_shared_factory(Arc::new(factory))
    }

    /// Start from a factory that is shared with other loaders.
    pub fn with_shared_factory(factory: Arc<dyn ProviderFactory<P>>) -> Self {
        Self {
            factory,
            name: "data-loader".to_string(),
            max_cached: None,
            affinity: AffinityPolicy::default(),
            parent: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Keep at most `max` providers, evicting the least recently used.
    pub fn with_max_cached(mut self, max: usize) -> Self {
        self.max_cached = Some(max);
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.max_cached = None;
        self
    }

    pub fn with_affinity(mut self, policy: AffinityPolicy) -> Self {
        self.affinity = policy;
        self
    }

    /// Tear the loader down when `parent` is disposed.
    pub fn with_parent(mut self, parent: &Disposable) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Apply the values set in `config` on top of the builder defaults.
    pub fn from_config<F>(config: &LoaderConfig, factory: F) -> Result<Self, ConfigError>
    where
        F: ProviderFactory<P> + 'static,
    {
        config.validate()?;

        let mut builder = LoaderBuilder::new(factory).with_affinity(config.affinity_policy()?);
        if let Some(name) = config.name.as_deref() {
            builder = builder.with_name(name);
        }
        if let Some(max) = config.max_cached {
            builder = builder.with_max_cached(max);
        }
        Ok(builder)
    }

    /// Build the loader, binding it to the calling thread.
    pub fn build(self) -> Result<DataLoader<P>, LoaderError> {
        let max_cached = match self.max_cached {
            Some(max) => Some(NonZeroUsize::new(max).ok_or_else(|| {
                LoaderError::InvalidOption("max_cached must be at least 1".to_string())
            })?),
            None => None,
        };

        DataLoader::assemble(
            self.name,
            self.factory,
            self.affinity,
            max_cached,
            self.parent.as_ref(),
        )
    }
}
