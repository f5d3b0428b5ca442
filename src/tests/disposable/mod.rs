//! Disposable scope tests.
