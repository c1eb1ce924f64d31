//! Connection lifetime: pair symmetry, cascade on either endpoint's death,
//! forwarding chains, and receiver-side detach surface.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tether::{Limit, MethodKey, Notifier, Trackable};

const ON_CHANGE: MethodKey = MethodKey("on_change");
const ON_CLOSE: MethodKey = MethodKey("on_close");

#[test]
fn cascade_on_receiver_death() {
    let n = Notifier::<u32>::new();
    let hits = Rc::new(Cell::new(0u32));
    {
        let r = Trackable::new();
        let hits = Rc::clone(&hits);
        n.connect(&r, ON_CHANGE, move |v, _| hits.set(hits.get() + v));
        n.fire(&1);
        assert_eq!(n.count_connections(), 1);
    }
    // Receiver dropped: the emitter must have forgotten it entirely.
    assert_eq!(n.count_connections(), 0);
    n.fire(&10);
    assert_eq!(hits.get(), 1);
}

#[test]
fn cascade_on_emitter_death() {
    let r = Trackable::new();
    {
        let n = Notifier::<u32>::new();
        n.connect(&r, ON_CHANGE, |_, _| {});
        n.connect(&r, ON_CLOSE, |_, _| {});
        assert_eq!(r.count_registrations(), 2);
    }
    assert_eq!(r.count_registrations(), 0);
}

#[test]
fn chained_notification_forwards_payload_once() {
    let n1 = Notifier::<u32>::new();
    let n2 = Notifier::<u32>::new();
    let r = Trackable::new();
    let seen = Rc::new(RefCell::new(Vec::new()));

    n1.connect_notifier(&n2);
    let log = Rc::clone(&seen);
    n2.connect(&r, ON_CHANGE, move |v, _| log.borrow_mut().push(*v));

    n1.fire(&42);
    assert_eq!(*seen.borrow(), vec![42]);

    assert!(n1.is_connected_to_notifier(&n2));
    assert!(n1.is_connected_to(n2.trackable()));
    assert_eq!(n1.count_connections_notifier(&n2), 1);
    assert_eq!(n2.count_registrations(), 1);
}

#[test]
fn dropping_forward_target_severs_the_edge() {
    let n1 = Notifier::<u32>::new();
    {
        let n2 = Notifier::<u32>::new();
        n1.connect_notifier(&n2);
        assert_eq!(n1.count_connections(), 1);
    }
    assert_eq!(n1.count_connections(), 0);
    n1.fire(&0); // nothing downstream, must not crash
}

#[test]
fn dropping_forward_source_releases_target() {
    let n2 = Notifier::<u32>::new();
    {
        let n1 = Notifier::<u32>::new();
        n1.connect_notifier(&n2);
        assert_eq!(n2.count_registrations(), 1);
    }
    assert_eq!(n2.count_registrations(), 0);
}

#[test]
fn disconnect_notifier_by_filter() {
    let n1 = Notifier::<u32>::new();
    let n2 = Notifier::<u32>::new();
    n1.connect_notifier(&n2);
    n1.connect_notifier(&n2);
    assert_eq!(n1.disconnect_notifier(&n2, -1, Limit::Count(1)), 1);
    assert_eq!(n1.count_connections_notifier(&n2), 1);
    assert_eq!(n1.disconnect_all_notifier(&n2), 1);
    assert!(!n1.is_connected_to_notifier(&n2));
    assert_eq!(n2.count_registrations(), 0);
}

#[test]
fn detach_all_releases_every_emitter() {
    let n1 = Notifier::<()>::new();
    let n2 = Notifier::<()>::new();
    let r = Trackable::new();
    n1.connect(&r, ON_CHANGE, |_, _| {});
    n2.connect(&r, ON_CHANGE, |_, _| {});
    n2.connect(&r, ON_CLOSE, |_, _| {});

    r.detach_all();
    assert_eq!(r.count_registrations(), 0);
    assert_eq!(n1.count_connections(), 0);
    assert_eq!(n2.count_connections(), 0);
}

#[test]
fn detach_all_to_is_method_selective() {
    let n = Notifier::<()>::new();
    let r = Trackable::new();
    n.connect(&r, ON_CHANGE, |_, _| {});
    n.connect(&r, ON_CLOSE, |_, _| {});
    n.connect(&r, ON_CHANGE, |_, _| {});

    r.detach_all_to(ON_CHANGE);
    assert_eq!(r.count_registrations(), 1);
    assert_eq!(r.count_registrations_to(ON_CHANGE), 0);
    assert_eq!(n.count_connections(), 1);
    assert!(n.is_connected_to_method(&r, ON_CLOSE));
    assert!(!n.is_connected_to_method(&r, ON_CHANGE));
}

#[test]
fn severed_callback_owning_another_receiver_cascades_cleanly() {
    // The "outer" callback owns `inner`, which itself has a registration on
    // the same notifier. Dropping `outer` severs its edge, which drops the
    // callback, which drops `inner`, which severs again on the same core —
    // the whole chain must run without the first sever still holding the
    // notifier borrowed.
    let n = Notifier::<()>::new();
    let inner = Trackable::new();
    n.connect(&inner, ON_CHANGE, |_, _| {});
    {
        let outer = Trackable::new();
        n.connect(&outer, ON_CLOSE, move |_, _| {
            let _ = inner.id();
        });
        assert_eq!(n.count_connections(), 2);
    }
    assert_eq!(n.count_connections(), 0);
    n.fire(&());
}

#[test]
fn symmetric_query_sees_both_directions() {
    let n = Notifier::<()>::new();
    let busy = Trackable::new(); // many registrations to other notifiers
    let others: Vec<Notifier<()>> = (0..5).map(|_| Notifier::new()).collect();
    for other in &others {
        other.connect(&busy, ON_CHANGE, |_, _| {});
    }
    assert!(!n.is_connected_to(&busy));

    n.connect(&busy, ON_CLOSE, |_, _| {});
    assert!(n.is_connected_to(&busy));

    // Also from a receiver whose registration sits deep in the emitter list.
    let late = Trackable::new();
    for _ in 0..4 {
        let filler = Trackable::new();
        n.connect(&filler, ON_CHANGE, |_, _| {});
        // filler dropped here, edge collapses; repopulate with live ones
    }
    for other in &others {
        n.connect_notifier(other);
    }
    n.connect(&late, ON_CHANGE, |_, _| {});
    assert!(n.is_connected_to(&late));
}

#[test]
fn emitter_side_position_does_not_reorder_receiver_list() {
    let n = Notifier::<()>::new();
    let r = Trackable::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    for tag in ["a", "b"] {
        let log = Rc::clone(&log);
        n.connect(&r, MethodKey(tag), move |_, _| log.borrow_mut().push(tag));
    }
    // Prepend on the emitter side; the receiver side always appends.
    let log_c = Rc::clone(&log);
    n.connect_at(0, &r, MethodKey("c"), move |_, _| log_c.borrow_mut().push("c"));

    n.fire(&());
    assert_eq!(*log.borrow(), vec!["c", "a", "b"]);
    assert_eq!(r.count_registrations(), 3);
}

#[test]
fn negative_insert_positions() {
    let n = Notifier::<()>::new();
    let r = Trackable::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let push = |tag: &'static str| {
        let log = Rc::clone(&log);
        move |_: &(), _: &mut tether::Cursor<()>| log.borrow_mut().push(tag)
    };
    n.connect(&r, MethodKey("a"), push("a"));
    n.connect(&r, MethodKey("b"), push("b"));
    n.connect_at(-2, &r, MethodKey("m"), push("m")); // before the last
    n.connect_at(-100, &r, MethodKey("f"), push("f")); // clamps to front

    n.fire(&());
    assert_eq!(*log.borrow(), vec!["f", "a", "m", "b"]);
}
