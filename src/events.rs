//! Invalidation listeners.
//!
//! Every registration is bound to a caller-supplied `Disposable`. The scope
//! keeps only a weak reference back to the listener set, so a set that has
//! been dropped is never kept alive by the scopes that once listened to it.
//! Removing a listener any other way withdraws its cleanup from the scope.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::PrNumber;
use crate::disposable::{Disposable, Registration};
use crate::error::ScopeError;

/// Callback invoked with the number whose provider was invalidated.
pub type InvalidationListener = Arc<dyn Fn(PrNumber) + Send + Sync>;

struct Listener {
    id: u64,
    callback: InvalidationListener,
    registration: Registration,
}

#[derive(Default)]
struct Registrations {
    next_id: u64,
    listeners: Vec<Listener>,
}

/// Ordered set of scoped invalidation listeners.
#[derive(Default)]
pub struct ListenerSet {
    inner: Mutex<Registrations>,
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.len())
            .finish()
    }
}

impl ListenerSet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add `listener` for as long as `scope` is alive.
    pub fn add(
        self: &Arc<Self>,
        scope: &Disposable,
        listener: InvalidationListener,
    ) -> Result<(), ScopeError> {
        // Held across `register` so a concurrent dispose of `scope` cannot
        // remove the entry before it is pushed.
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        let set: Weak<ListenerSet> = Arc::downgrade(self);
        let registration = scope.register(move || {
            if let Some(set) = set.upgrade() {
                set.remove(id);
            }
        })?;

        inner.listeners.push(Listener {
            id,
            callback: listener,
            registration,
        });
        Ok(())
    }

    /// Called by the owning scope's cleanup, so the registration is already spent.
    fn remove(&self, id: u64) {
        let mut inner = self.inner.lock();
        inner.listeners.retain(|listener| listener.id != id);
    }

    /// Drop every registration and withdraw the cleanups from their scopes.
    pub fn clear(&self) {
        let removed = std::mem::take(&mut self.inner.lock().listeners);
        for listener in removed {
            listener.registration.cancel();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every listener once for each number, in registration order.
    ///
    /// The listener list is snapshotted first, so listeners may add or remove
    /// registrations while being notified.
    pub fn notify_all(&self, numbers: &[PrNumber]) {
        if numbers.is_empty() {
            return;
        }
        let snapshot: Vec<InvalidationListener> = self
            .inner
            .lock()
            .listeners
            .iter()
            .map(|listener| listener.callback.clone())
            .collect();

        for &number in numbers {
            for listener in &snapshot {
                listener(number);
            }
        }
    }
}

impl Drop for ListenerSet {
    fn drop(&mut self) {
        for listener in self.inner.get_mut().listeners.drain(..) {
            listener.registration.cancel();
        }
    }
}
