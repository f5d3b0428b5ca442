//! Tests for thread affinity enforcement.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use crate::tests::support::{CountingFactory, TestProvider};
use crate::{
    AffinityPolicy, BoxError, DataLoader, Disposable, LoaderBuilder, LoaderError, PrNumber,
    ProviderFactory,
};

fn loader_with(policy: AffinityPolicy) -> Arc<DataLoader<TestProvider>> {
    Arc::new(
        LoaderBuilder::new(CountingFactory::default())
            .with_affinity(policy)
            .build()
            .unwrap(),
    )
}

#[test]
fn default_policy_is_error() {
    assert_eq!(AffinityPolicy::default(), AffinityPolicy::Error);
    let loader = LoaderBuilder::new(CountingFactory::default())
        .build()
        .unwrap();
    assert_eq!(loader.affinity_policy(), AffinityPolicy::Error);
}

#[test]
fn off_thread_call_returns_wrong_thread() {
    let loader = loader_with(AffinityPolicy::Error);
    let owner = thread::current().id();

    let remote = loader.clone();
    let err = thread::spawn(move || remote.get_data_provider(1).unwrap_err())
        .join()
        .unwrap();

    match err {
        LoaderError::WrongThread {
            operation,
            expected,
            actual,
        } => {
            assert_eq!(operation, "get_data_provider");
            assert_eq!(expected, owner);
            assert_ne!(actual, owner);
        }
        other => panic!("expected WrongThread, got: {other:?}"),
    }
    assert!(loader.is_empty());
}

#[test]
fn every_operation_is_checked() {
    let loader = loader_with(AffinityPolicy::Error);

    let remote = loader.clone();
    let results = thread::spawn(move || {
        vec![
            remote.find_data_provider(1).err(),
            remote.invalidate_all_data().err(),
            remote.invalidate_data(1).err(),
            remote
                .add_invalidation_listener(&Disposable::new(), |_| {})
                .err(),
        ]
    })
    .join()
    .unwrap();

    for err in results {
        assert!(matches!(err, Some(LoaderError::WrongThread { .. })));
    }
}

#[test]
fn panic_policy_panics_off_thread() {
    let loader = loader_with(AffinityPolicy::Panic);

    let remote = loader.clone();
    let outcome = thread::spawn(move || {
        let _ = remote.get_data_provider(1);
    })
    .join();

    assert!(outcome.is_err());
    assert!(loader.get_data_provider(1).is_ok());
}

#[test]
fn any_thread_policy_shares_one_instance_per_number() {
    let loader = loader_with(AffinityPolicy::AnyThread);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let loader = loader.clone();
            thread::spawn(move || loader.get_data_provider(7).unwrap())
        })
        .collect();

    let providers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let stored = loader.find_data_provider(7).unwrap().unwrap();

    for provider in &providers {
        assert!(Arc::ptr_eq(provider, &stored));
    }
}

#[test]
fn concurrent_first_requests_run_the_factory_once() {
    let factory = CountingFactory::default();
    let slow = factory.clone();
    let loader = Arc::new(
        LoaderBuilder::new(move |number: PrNumber, scope: &Disposable| {
            thread::sleep(Duration::from_millis(50));
            slow.create(number, scope)
        })
        .with_affinity(AffinityPolicy::AnyThread)
        .build()
        .unwrap(),
    );

    let start = Arc::new(Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let loader = loader.clone();
            let start = start.clone();
            thread::spawn(move || {
                start.wait();
                loader.get_data_provider(7).unwrap()
            })
        })
        .collect();
    let providers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(factory.created(), 1);
    assert_eq!(factory.disposed(), 0);
    for provider in &providers[1..] {
        assert!(Arc::ptr_eq(provider, &providers[0]));
    }
}

#[test]
fn waiters_retry_after_a_failed_construction() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let loader = Arc::new(
        LoaderBuilder::new(move |number: PrNumber, _scope: &Disposable| -> Result<TestProvider, BoxError> {
            thread::sleep(Duration::from_millis(50));
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err("first attempt fails".into());
            }
            Ok(TestProvider { number, serial: 0 })
        })
        .with_affinity(AffinityPolicy::AnyThread)
        .build()
        .unwrap(),
    );

    let start = Arc::new(Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let loader = loader.clone();
            let start = start.clone();
            thread::spawn(move || {
                start.wait();
                loader.get_data_provider(3)
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let failures = results
        .iter()
        .filter(|r| matches!(r, Err(LoaderError::Construction { number: 3, .. })))
        .count();
    assert_eq!(failures, 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);

    let stored = loader.find_data_provider(3).unwrap().unwrap();
    for provider in results.iter().filter_map(|r| r.as_ref().ok()) {
        assert!(Arc::ptr_eq(provider, &stored));
    }
}

#[test]
fn diagnostic_accessors_skip_the_thread_check() {
    let loader = loader_with(AffinityPolicy::Error);
    loader.get_data_provider(3).unwrap();
    loader
        .add_invalidation_listener(&Disposable::new(), |_| {})
        .unwrap();

    let remote = loader.clone();
    let (numbers, len, listeners, disposed) = thread::spawn(move || {
        (
            remote.cached_numbers(),
            remote.len(),
            remote.listener_count(),
            remote.is_disposed(),
        )
    })
    .join()
    .unwrap();

    assert_eq!(numbers, vec![3]);
    assert_eq!(len, 1);
    assert_eq!(listeners, 1);
    assert!(!disposed);
}

#[test]
fn any_thread_get_racing_invalidate_sees_consistent_state() {
    let loader = loader_with(AffinityPolicy::AnyThread);

    let readers: Vec<_> = (0..4)
        .map(|t| {
            let loader = loader.clone();
            thread::spawn(move || {
                for i in 0..200 {
                    let number = (t * 1000 + i) % 16;
                    let provider = loader.get_data_provider(number).unwrap();
                    assert_eq!(provider.number, number);
                }
            })
        })
        .collect();

    let invalidator = {
        let loader = loader.clone();
        thread::spawn(move || {
            for _ in 0..50 {
                loader.invalidate_all_data().unwrap();
            }
        })
    };

    for handle in readers {
        handle.join().unwrap();
    }
    invalidator.join().unwrap();

    for number in loader.cached_numbers() {
        let provider = loader.find_data_provider(number).unwrap().unwrap();
        assert_eq!(provider.number, number);
    }
}

#[test]
fn teardown_is_allowed_from_any_thread() {
    let loader = loader_with(AffinityPolicy::Error);
    loader.get_data_provider(1).unwrap();

    let remote = loader.clone();
    let disposed = thread::spawn(move || remote.dispose()).join().unwrap();

    assert!(disposed);
    assert!(loader.is_disposed());
}

#[test]
fn policy_parses_from_config_spellings() {
    assert_eq!(AffinityPolicy::from_str("error"), Some(AffinityPolicy::Error));
    assert_eq!(AffinityPolicy::from_str("PANIC"), Some(AffinityPolicy::Panic));
    assert_eq!(AffinityPolicy::from_str("any"), Some(AffinityPolicy::AnyThread));
    assert_eq!(AffinityPolicy::from_str("sometimes"), None);
    assert_eq!(AffinityPolicy::AnyThread.to_string(), "any");
}
