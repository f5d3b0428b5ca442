//! Provider construction.
//!
//! The loader never knows what a provider is. It asks a `ProviderFactory` to
//! build one for a number and hands the factory a fresh `Disposable` that
//! ends when the loader drops the provider from its cache.

use std::marker::PhantomData;

use crate::PrNumber;
use crate::disposable::Disposable;
use crate::error::BoxError;

/// Builds the provider for a single pull-request number.
pub trait ProviderFactory<P>: Send + Sync {
    /// Construct the provider for `number`.
    ///
    /// `scope` is disposed when the provider is invalidated, evicted, or the
    /// loader is torn down. Anything the provider needs released should be
    /// registered on it.
    fn create(&self, number: PrNumber, scope: &Disposable) -> Result<P, BoxError>;
}

impl<P, E, F> ProviderFactory<P> for F
where
    F: Fn(PrNumber, &Disposable) -> Result<P, E> + Send + Sync,
    E: Into<BoxError>,
{
    fn create(&self, number: PrNumber, scope: &Disposable) -> Result<P, BoxError> {
        self(number, scope).map_err(Into::into)
    }
}

/// Factory adapter for closures that do not need the provider scope.
pub struct FnFactory<F, P> {
    f: F,
    _provider: PhantomData<fn() -> P>,
}

impl<F, P> std::fmt::Debug for FnFactory<F, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFactory").finish_non_exhaustive()
    }
}

/// Wrap a `Fn(PrNumber) -> Result<P, E>` as a `ProviderFactory`.
///
/// ```rust
/// use prloader::{LoaderBuilder, provider::from_fn};
///
/// let loader = LoaderBuilder::new(from_fn(|number| {
///     Ok::<_, std::io::Error>(format!("provider for #{number}"))
/// }))
/// .build()
/// .unwrap();
///
/// assert_eq!(*loader.get_data_provider(7).unwrap(), "provider for #7");
/// ```
pub fn from_fn<F, P, E>(f: F) -> FnFactory<F, P>
where
    F: Fn(PrNumber) -> Result<P, E> + Send + Sync,
    E: Into<BoxError>,
{
    FnFactory {
        f,
        _provider: PhantomData,
    }
}

impl<F, P, E> ProviderFactory<P> for FnFactory<F, P>
where
    F: Fn(PrNumber) -> Result<P, E> + Send + Sync,
    E: Into<BoxError>,
{
    fn create(&self, number: PrNumber, _scope: &Disposable) -> Result<P, BoxError> {
        (self.f)(number).map_err(Into::into)
    }
}
