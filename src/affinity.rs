//! Thread affinity for loader operations.
//!
//! A loader is bound to the thread that built it. `AffinityPolicy` decides
//! what happens when a public operation is called from any other thread.

use std::fmt;
use std::thread::{self, ThreadId};

use crate::error::LoaderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AffinityPolicy {
    /// Return `LoaderError::WrongThread` from the offending call
    #[default]
    Error,
    /// Panic on the offending call
    Panic,
    /// Accept calls from any thread; the loader's mutex serializes them
    AnyThread,
}

impl fmt::Display for AffinityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AffinityPolicy::Error => write!(f, "error"),
            AffinityPolicy::Panic => write!(f, "panic"),
            AffinityPolicy::AnyThread => write!(f, "any"),
        }
    }
}

impl AffinityPolicy {
    /// Parse a policy from its config spelling.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "error" | "strict" => Some(AffinityPolicy::Error),
            "panic" | "assert" => Some(AffinityPolicy::Panic),
            "any" | "any_thread" | "any-thread" | "none" => Some(AffinityPolicy::AnyThread),
            _ => None,
        }
    }
}

/// The designated thread of a loader together with its enforcement policy.
#[derive(Debug, Clone, Copy)]
pub struct ThreadAffinity {
    owner: ThreadId,
    policy: AffinityPolicy,
}

impl ThreadAffinity {
    /// Bind to the calling thread.
    pub fn current(policy: AffinityPolicy) -> Self {
        Self {
            owner: thread::current().id(),
            policy,
        }
    }

    pub fn policy(&self) -> AffinityPolicy {
        self.policy
    }

    /// Check that `operation` runs on the designated thread.
    pub fn check(&self, operation: &'static str) -> Result<(), LoaderError> {
        if self.policy == AffinityPolicy::AnyThread {
            return Ok(());
        }

        let actual = thread::current().id();
        if actual == self.owner {
            return Ok(());
        }

        tracing::warn!(
            operation,
            expected = ?self.owner,
            actual = ?actual,
            "loader called off its designated thread"
        );

        match self.policy {
            AffinityPolicy::Panic => panic!(
                "`{operation}` called from thread {actual:?}, but the loader is bound to {:?}",
                self.owner
            ),
            _ => Err(LoaderError::WrongThread {
                operation,
                expected: self.owner,
                actual,
            }),
        }
    }
}
