//! Disposable scopes: bounded lifetimes with single-shot cleanup.
//!
//! A `Disposable` owns a list of cleanup closures. Disposing it runs every
//! registered cleanup exactly once, most recently registered first. Scopes
//! form a tree through `register_child`: the parent owns its children, never
//! the reverse.
//!
//! ```rust
//! use prloader::Disposable;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let project = Disposable::named("project");
//! let panel = project.child("panel").unwrap();
//!
//! let closed = Arc::new(AtomicUsize::new(0));
//! let counter = closed.clone();
//! panel
//!     .register(move || {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     })
//!     .unwrap();
//!
//! assert!(project.dispose());
//! assert!(panel.is_disposed());
//! assert_eq!(closed.load(Ordering::SeqCst), 1);
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::ScopeError;

type Cleanup = Box<dyn FnOnce() + Send>;

/// Handle to a bounded lifetime.
///
/// Cloning the handle does not create a new scope; all clones observe and
/// control the same lifetime.
#[derive(Clone)]
pub struct Disposable {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    name: String,
    state: Mutex<ScopeState>,
}

#[derive(Default)]
struct ScopeState {
    disposed: bool,
    next_id: u64,
    cleanups: Vec<(u64, Cleanup)>,
    /// Where this scope is registered as a child.
    parents: Vec<Registration>,
}

/// Handle to one cleanup registered on a `Disposable`.
///
/// Dropping the handle keeps the cleanup registered; call `cancel` to
/// withdraw it before the scope ends.
#[derive(Debug, Clone)]
pub struct Registration {
    scope: Weak<ScopeInner>,
    id: u64,
}

impl Registration {
    /// Remove the cleanup without running it.
    ///
    /// Returns `false` if it already ran, was already cancelled, or its scope
    /// is gone.
    pub fn cancel(&self) -> bool {
        let Some(scope) = self.scope.upgrade() else {
            return false;
        };
        let removed = {
            let mut state = scope.state.lock();
            state
                .cleanups
                .iter()
                .position(|(id, _)| *id == self.id)
                .map(|index| state.cleanups.remove(index))
        };
        // The closure is dropped here, outside the scope's lock.
        removed.is_some()
    }
}

impl fmt::Debug for Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Disposable")
            .field("name", &self.inner.name)
            .field("disposed", &state.disposed)
            .field("pending_cleanups", &state.cleanups.len())
            .finish()
    }
}

impl Default for Disposable {
    fn default() -> Self {
        Self::new()
    }
}

impl Disposable {
    /// Create a new anonymous scope.
    pub fn new() -> Self {
        Self::named("anonymous")
    }

    /// Create a new scope with a name used in logs and errors.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                name: name.into(),
                state: Mutex::new(ScopeState::default()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }

    /// Cleanups registered and not yet run.
    pub fn pending_cleanups(&self) -> usize {
        self.inner.state.lock().cleanups.len()
    }

    /// Register a cleanup to run when this scope is disposed.
    ///
    /// Fails if the scope has already been disposed; the cleanup is dropped
    /// without running in that case.
    pub fn register<F>(&self, cleanup: F) -> Result<Registration, ScopeError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.inner.state.lock();
        if state.disposed {
            return Err(self.already_disposed());
        }
        let id = state.next_id;
        state.next_id += 1;
        state.cleanups.push((id, Box::new(cleanup)));
        Ok(Registration {
            scope: Arc::downgrade(&self.inner),
            id,
        })
    }

    /// Make `child` end no later than this scope.
    ///
    /// If `child` is disposed first, it is removed from this scope.
    pub fn register_child(&self, child: &Disposable) -> Result<(), ScopeError> {
        if Arc::ptr_eq(&self.inner, &child.inner) {
            return Ok(());
        }
        let registration = {
            let child = child.clone();
            self.register(move || {
                child.dispose();
            })?
        };

        let mut state = child.inner.state.lock();
        if state.disposed {
            drop(state);
            registration.cancel();
        } else {
            state.parents.push(registration);
        }
        Ok(())
    }

    /// Create a named scope that is disposed together with this one.
    pub fn child(&self, name: impl Into<String>) -> Result<Disposable, ScopeError> {
        let child = Disposable::named(name);
        self.register_child(&child)?;
        Ok(child)
    }

    /// End this scope.
    ///
    /// Returns `true` for the call that actually disposed the scope and
    /// `false` for every later call. Cleanups run outside the scope's lock,
    /// in reverse registration order; a panicking cleanup is logged and the
    /// rest still run.
    pub fn dispose(&self) -> bool {
        let (cleanups, parents) = {
            let mut state = self.inner.state.lock();
            if state.disposed {
                return false;
            }
            state.disposed = true;
            (
                std::mem::take(&mut state.cleanups),
                std::mem::take(&mut state.parents),
            )
        };

        tracing::trace!(scope = %self.inner.name, cleanups = cleanups.len(), "disposing scope");

        for (_, cleanup) in cleanups.into_iter().rev() {
            if panic::catch_unwind(AssertUnwindSafe(cleanup)).is_err() {
                tracing::error!(scope = %self.inner.name, "cleanup panicked during dispose");
            }
        }
        for registration in parents {
            registration.cancel();
        }
        true
    }

    fn already_disposed(&self) -> ScopeError {
        ScopeError::AlreadyDisposed {
            name: self.inner.name.clone(),
        }
    }
}
