//! The data loader: one lazily built provider per pull-request number.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use lru::LruCache;
use parking_lot::{Condvar, Mutex};

use crate::PrNumber;
use crate::affinity::{AffinityPolicy, ThreadAffinity};
use crate::disposable::Disposable;
use crate::error::LoaderError;
use crate::events::ListenerSet;
use crate::provider::ProviderFactory;

/// Registry of cached data providers keyed by pull-request number.
///
/// Every public operation except teardown must run on the thread that built
/// the loader unless it was built with `AffinityPolicy::AnyThread`. Dropping
/// the loader, calling `dispose`, or disposing its owning scope tears it
/// down exactly once.
pub struct DataLoader<P> {
    shared: Arc<Shared<P>>,
    factory: Arc<dyn ProviderFactory<P>>,
    affinity: ThreadAffinity,
    scope: Disposable,
}

struct Shared<P> {
    name: String,
    max_cached: Option<NonZeroUsize>,
    cache: Mutex<CacheState<P>>,
    listeners: Arc<ListenerSet>,
}

struct CacheState<P> {
    disposed: bool,
    entries: LruCache<PrNumber, Entry<P>>,
    /// Numbers whose provider is being built right now.
    pending: HashMap<PrNumber, Arc<Pending<P>>>,
}

struct Entry<P> {
    provider: Arc<P>,
    scope: Disposable,
}

type Removed<P> = Vec<(PrNumber, Entry<P>)>;

impl<P> CacheState<P> {
    fn ensure_alive(&self) -> Result<(), LoaderError> {
        if self.disposed {
            Err(LoaderError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Look up `number` and mark it most recently used.
    fn touch(&mut self, number: PrNumber) -> Option<Arc<P>> {
        self.entries.get(&number).map(|entry| entry.provider.clone())
    }

    /// Store a provider, returning whatever the capacity bound pushed out.
    fn insert(&mut self, number: PrNumber, provider: Arc<P>, scope: Disposable) -> Removed<P> {
        self.entries
            .push(number, Entry { provider, scope })
            .into_iter()
            .collect()
    }

    fn drain(&mut self) -> Removed<P> {
        std::iter::from_fn(|| self.entries.pop_lru()).collect()
    }
}

/// A construction in flight. Other callers asking for the same number wait
/// for its outcome instead of running the factory again.
struct Pending<P> {
    builder: ThreadId,
    outcome: Mutex<Option<Option<Arc<P>>>>,
    ready: Condvar,
}

impl<P> Pending<P> {
    fn new() -> Self {
        Self {
            builder: thread::current().id(),
            outcome: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// `None` means nothing was stored; waiters look the number up again.
    fn finish(&self, provider: Option<Arc<P>>) {
        *self.outcome.lock() = Some(provider);
        self.ready.notify_all();
    }

    fn wait(&self) -> Option<Arc<P>> {
        let mut outcome = self.outcome.lock();
        loop {
            if let Some(provider) = outcome.as_ref() {
                return provider.clone();
            }
            self.ready.wait(&mut outcome);
        }
    }
}

/// Owns a pending slot until the construction is stored. If the factory
/// fails or panics, dropping the guard frees the slot and wakes waiters.
struct InFlight<'a, P> {
    shared: &'a Shared<P>,
    number: PrNumber,
    pending: Arc<Pending<P>>,
    finished: bool,
}

impl<P> InFlight<'_, P> {
    /// Must be called after the slot was removed from `pending`.
    fn finish(mut self, provider: Option<Arc<P>>) {
        self.finished = true;
        self.pending.finish(provider);
    }
}

impl<P> Drop for InFlight<'_, P> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        {
            let mut cache = self.shared.cache.lock();
            if cache
                .pending
                .get(&self.number)
                .is_some_and(|slot| Arc::ptr_eq(slot, &self.pending))
            {
                cache.pending.remove(&self.number);
            }
        }
        self.pending.finish(None);
    }
}

impl<P> Shared<P> {
    /// Dispose removed providers, then tell listeners about them.
    ///
    /// Must be called without holding the cache lock.
    fn release(&self, mut removed: Removed<P>, reason: &'static str) {
        if removed.is_empty() {
            return;
        }
        removed.sort_by_key(|(number, _)| *number);

        let numbers: Vec<PrNumber> = removed.iter().map(|(number, _)| *number).collect();
        tracing::debug!(loader = %self.name, reason, ?numbers, "releasing data providers");

        for (_, entry) in removed {
            entry.scope.dispose();
        }
        self.listeners.notify_all(&numbers);
    }

    fn teardown(&self) {
        let removed = {
            let mut cache = self.cache.lock();
            if cache.disposed {
                return;
            }
            cache.disposed = true;
            cache.drain()
        };

        tracing::info!(loader = %self.name, cached = removed.len(), "tearing down data loader");
        self.release(removed, "teardown");
        self.listeners.clear();
    }
}

impl<P> fmt::Debug for DataLoader<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.shared.cache.lock();
        f.debug_struct("DataLoader")
            .field("name", &self.shared.name)
            .field("cached", &cache.entries.len())
            .field("pending", &cache.pending.len())
            .field("disposed", &cache.disposed)
            .field("max_cached", &self.shared.max_cached)
            .field("affinity", &self.affinity)
            .finish()
    }
}

impl<P> DataLoader<P>
where
    P: Send + Sync + 'static,
{
    /// Wire up a loader. Use `LoaderBuilder` instead of calling this directly.
    pub(crate) fn assemble(
        name: String,
        factory: Arc<dyn ProviderFactory<P>>,
        policy: AffinityPolicy,
        max_cached: Option<NonZeroUsize>,
        parent: Option<&Disposable>,
    ) -> Result<Self, LoaderError> {
        let entries = match max_cached {
            Some(max) => LruCache::new(max),
            None => LruCache::unbounded(),
        };
        let shared = Arc::new(Shared {
            name: name.clone(),
            max_cached,
            cache: Mutex::new(CacheState {
                disposed: false,
                entries,
                pending: HashMap::new(),
            }),
            listeners: ListenerSet::new(),
        });

        let scope = Disposable::named(name);
        let weak: Weak<Shared<P>> = Arc::downgrade(&shared);
        scope.register(move || {
            if let Some(shared) = weak.upgrade() {
                shared.teardown();
            }
        })?;

        if let Some(parent) = parent {
            parent.register_child(&scope)?;
        }

        tracing::debug!(
            loader = %shared.name,
            ?max_cached,
            %policy,
            "data loader created"
        );

        Ok(Self {
            shared,
            factory,
            affinity: ThreadAffinity::current(policy),
            scope,
        })
    }

    /// Return the cached provider for `number`, building it on first request.
    ///
    /// Two calls with no invalidation in between return the same instance.
    /// The factory runs at most once per number at a time: concurrent callers
    /// wait for the construction already in flight. A factory failure is
    /// returned as `LoaderError::Construction` and leaves nothing cached.
    pub fn get_data_provider(&self, number: PrNumber) -> Result<Arc<P>, LoaderError> {
        self.affinity.check("get_data_provider")?;
        loop {
            let pending = {
                let mut cache = self.shared.cache.lock();
                cache.ensure_alive()?;
                if let Some(provider) = cache.touch(number) {
                    tracing::trace!(loader = %self.shared.name, number, "data provider cache hit");
                    return Ok(provider);
                }
                match cache.pending.get(&number).cloned() {
                    Some(pending) => pending,
                    None => {
                        let pending = Arc::new(Pending::new());
                        cache.pending.insert(number, pending.clone());
                        drop(cache);
                        return self.construct(number, pending);
                    }
                }
            };

            if pending.builder == thread::current().id() {
                return Err(LoaderError::RecursiveConstruction { number });
            }
            tracing::trace!(
                loader = %self.shared.name,
                number,
                "waiting for data provider under construction"
            );
            if let Some(provider) = pending.wait() {
                return Ok(provider);
            }
        }
    }

    /// Run the factory for `number` while holding its pending slot.
    fn construct(&self, number: PrNumber, pending: Arc<Pending<P>>) -> Result<Arc<P>, LoaderError> {
        let in_flight = InFlight {
            shared: &self.shared,
            number,
            pending,
            finished: false,
        };

        let scope = Disposable::named(format!("{}#{number}", self.shared.name));
        let provider = match self.factory.create(number, &scope) {
            Ok(provider) => Arc::new(provider),
            Err(source) => {
                scope.dispose();
                tracing::debug!(
                    loader = %self.shared.name,
                    number,
                    error = %source,
                    "data provider construction failed"
                );
                return Err(LoaderError::Construction { number, source });
            }
        };

        let mut cache = self.shared.cache.lock();
        cache.pending.remove(&number);
        if cache.disposed {
            drop(cache);
            in_flight.finish(None);
            scope.dispose();
            return Err(LoaderError::Disposed);
        }

        let evicted = cache.insert(number, provider.clone(), scope);
        drop(cache);
        in_flight.finish(Some(provider.clone()));
        tracing::debug!(loader = %self.shared.name, number, "data provider created");

        self.shared.release(evicted, "evicted");
        Ok(provider)
    }

    /// Return the cached provider for `number` without building one.
    ///
    /// Does not count as a use for the capacity bound.
    pub fn find_data_provider(&self, number: PrNumber) -> Result<Option<Arc<P>>, LoaderError> {
        self.affinity.check("find_data_provider")?;
        let cache = self.shared.cache.lock();
        cache.ensure_alive()?;
        Ok(cache
            .entries
            .peek(&number)
            .map(|entry| entry.provider.clone()))
    }

    /// Drop every cached provider.
    ///
    /// Each removed provider's scope is disposed, then every listener is
    /// called once per removed number in ascending order.
    pub fn invalidate_all_data(&self) -> Result<(), LoaderError> {
        self.affinity.check("invalidate_all_data")?;
        let removed = {
            let mut cache = self.shared.cache.lock();
            cache.ensure_alive()?;
            cache.drain()
        };
        self.shared.release(removed, "invalidated");
        Ok(())
    }

    /// Drop the cached provider for `number`, if any.
    ///
    /// Returns whether a provider was cached.
    pub fn invalidate_data(&self, number: PrNumber) -> Result<bool, LoaderError> {
        self.affinity.check("invalidate_data")?;
        let removed = {
            let mut cache = self.shared.cache.lock();
            cache.ensure_alive()?;
            cache.entries.pop(&number)
        };
        match removed {
            Some(entry) => {
                self.shared.release(vec![(number, entry)], "invalidated");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Call `listener` with every number whose provider is dropped, until
    /// `scope` is disposed.
    pub fn add_invalidation_listener<F>(
        &self,
        scope: &Disposable,
        listener: F,
    ) -> Result<(), LoaderError>
    where
        F: Fn(PrNumber) + Send + Sync + 'static,
    {
        self.affinity.check("add_invalidation_listener")?;
        self.shared.cache.lock().ensure_alive()?;

        self.shared
            .listeners
            .add(scope, Arc::new(listener))
            .inspect_err(|e| {
                tracing::warn!(
                    loader = %self.shared.name,
                    error = %e,
                    "listener registration rejected"
                );
            })?;
        tracing::trace!(
            loader = %self.shared.name,
            scope = scope.name(),
            "invalidation listener added"
        );
        Ok(())
    }
}

/// Diagnostic accessors. They only read a snapshot, so they skip the thread
/// affinity check and keep working after teardown.
impl<P> DataLoader<P> {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// The scope whose disposal tears this loader down.
    pub fn scope(&self) -> &Disposable {
        &self.scope
    }

    pub fn max_cached(&self) -> Option<usize> {
        self.shared.max_cached.map(NonZeroUsize::get)
    }

    pub fn affinity_policy(&self) -> AffinityPolicy {
        self.affinity.policy()
    }

    /// Numbers that currently have a cached provider, ascending.
    pub fn cached_numbers(&self) -> Vec<PrNumber> {
        let mut numbers: Vec<PrNumber> = self
            .shared
            .cache
            .lock()
            .entries
            .iter()
            .map(|(number, _)| *number)
            .collect();
        numbers.sort_unstable();
        numbers
    }

    pub fn len(&self) -> usize {
        self.shared.cache.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.cache.lock().disposed
    }

    /// Tear the loader down. Returns `false` if it was already torn down.
    pub fn dispose(&self) -> bool {
        self.scope.dispose()
    }
}

impl<P> Drop for DataLoader<P> {
    fn drop(&mut self) {
        self.scope.dispose();
    }
}
