//! Shared helpers for the internal tests.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::{DataLoader, Disposable, LoaderBuilder, PrNumber, ProviderFactory};

/// Provider stand-in that remembers which construction produced it.
#[derive(Debug)]
pub struct TestProvider {
    pub number: PrNumber,
    pub serial: usize,
}

/// Factory that counts constructions and disposals of its providers.
#[derive(Clone, Default)]
pub struct CountingFactory {
    pub created: Arc<AtomicUsize>,
    pub disposed: Arc<AtomicUsize>,
}

impl CountingFactory {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl ProviderFactory<TestProvider> for CountingFactory {
    fn create(
        &self,
        number: PrNumber,
        scope: &Disposable,
    ) -> Result<TestProvider, crate::BoxError> {
        let serial = self.created.fetch_add(1, Ordering::SeqCst);
        let disposed = self.disposed.clone();
        scope.register(move || {
            disposed.fetch_add(1, Ordering::SeqCst);
        })?;
        Ok(TestProvider { number, serial })
    }
}

pub fn loader() -> (DataLoader<TestProvider>, CountingFactory) {
    let factory = CountingFactory::default();
    let loader = LoaderBuilder::new(factory.clone())
        .with_name("test-loader")
        .build()
        .expect("build loader");
    (loader, factory)
}

/// Listener that appends every number it hears about.
pub fn recorder() -> (
    Arc<Mutex<Vec<PrNumber>>>,
    impl Fn(PrNumber) + Send + Sync + 'static,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |number: PrNumber| sink.lock().unwrap().push(number))
}

pub fn sorted(seen: &Arc<Mutex<Vec<PrNumber>>>) -> Vec<PrNumber> {
    let mut numbers = seen.lock().unwrap().clone();
    numbers.sort_unstable();
    numbers
}

pub fn infallible(number: PrNumber, _scope: &Disposable) -> Result<TestProvider, Infallible> {
    Ok(TestProvider { number, serial: 0 })
}
