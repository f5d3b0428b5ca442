//! Tests for ListenerSet.

use std::sync::{Arc, Mutex};

use crate::disposable::Disposable;
use crate::events::ListenerSet;

fn push_into(log: &Arc<Mutex<Vec<(char, i64)>>>, tag: char) -> crate::InvalidationListener {
    let log = log.clone();
    Arc::new(move |number: i64| log.lock().unwrap().push((tag, number)))
}

#[test]
fn notify_calls_listeners_in_registration_order() {
    let set = ListenerSet::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let scope = Disposable::new();

    set.add(&scope, push_into(&log, 'a')).unwrap();
    set.add(&scope, push_into(&log, 'b')).unwrap();
    set.notify_all(&[1, 2]);

    assert_eq!(
        *log.lock().unwrap(),
        vec![('a', 1), ('b', 1), ('a', 2), ('b', 2)]
    );
}

#[test]
fn scope_disposal_removes_only_its_listeners() {
    let set = ListenerSet::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let first = Disposable::named("first");
    let second = Disposable::named("second");

    set.add(&first, push_into(&log, 'a')).unwrap();
    set.add(&second, push_into(&log, 'b')).unwrap();
    first.dispose();
    set.notify_all(&[3]);

    assert_eq!(set.len(), 1);
    assert_eq!(*log.lock().unwrap(), vec![('b', 3)]);
}

#[test]
fn rejected_registration_leaves_set_unchanged() {
    let set = ListenerSet::new();
    let scope = Disposable::new();
    scope.dispose();

    assert!(set.add(&scope, Arc::new(|_: i64| {})).is_err());
    assert!(set.is_empty());
}

#[test]
fn scope_does_not_keep_set_alive() {
    let set = ListenerSet::new();
    let scope = Disposable::new();
    set.add(&scope, Arc::new(|_: i64| {})).unwrap();

    let weak = Arc::downgrade(&set);
    drop(set);

    assert!(weak.upgrade().is_none());
    assert!(scope.dispose());
}

#[test]
fn clear_drops_every_registration() {
    let set = ListenerSet::new();
    let scope = Disposable::new();
    set.add(&scope, Arc::new(|_: i64| {})).unwrap();
    set.add(&scope, Arc::new(|_: i64| {})).unwrap();

    set.clear();

    assert!(set.is_empty());
    assert!(scope.dispose());
}

#[test]
fn clear_withdraws_cleanups_from_listener_scopes() {
    let set = ListenerSet::new();
    let panel = Disposable::named("panel");
    for _ in 0..10 {
        set.add(&panel, Arc::new(|_: i64| {})).unwrap();
    }
    assert_eq!(panel.pending_cleanups(), 10);

    set.clear();

    assert_eq!(panel.pending_cleanups(), 0);
}

#[test]
fn dropped_set_withdraws_its_cleanups() {
    let set = ListenerSet::new();
    let panel = Disposable::named("panel");
    set.add(&panel, Arc::new(|_: i64| {})).unwrap();

    drop(set);

    assert_eq!(panel.pending_cleanups(), 0);
}
