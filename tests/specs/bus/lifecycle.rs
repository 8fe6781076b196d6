//! Engine and subscriber lifecycle specs

use crate::prelude::*;
use crate::prelude::assert_eq;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn events_published_before_start_arrive_in_order() {
    let bus = Bus::new(100);
    let publisher = bus.engine.publisher();
    assert_eq!(publisher.write(ev(7, 0)).unwrap(), 0);
    assert_eq!(publisher.write(ev(9, 1)).unwrap(), 0);

    let sub = bus.subscribe("sql", &[7, 9], &[7, 9]);
    bus.engine.start().unwrap();

    assert_eq!(sub.read(Deadline::Immediate), ReadOutcome::Event(Arc::new(ev(7, 0))));
    assert_eq!(sub.read(Deadline::Immediate), ReadOutcome::Event(Arc::new(ev(9, 1))));
}

#[test]
fn start_twice_is_a_no_op() {
    let bus = Bus::new(100);
    bus.engine.start().unwrap();
    bus.engine.start().unwrap();
    assert_eq!(bus.engine.state(), EngineState::Running);
}

#[test]
fn immediate_read_on_empty_muxer_returns_at_once() {
    let bus = Bus::running(100);
    let sub = bus.subscribe("sql", &[], &[]);

    let started = Instant::now();
    assert_eq!(sub.read(Deadline::Immediate), ReadOutcome::TimedOut);
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[test]
fn duplicate_name_fails_until_unsubscribed() {
    let bus = Bus::running(100);
    let _sub = bus.subscribe("sql", &[], &[]);
    assert!(matches!(
        bus.engine.subscribe("sql", FilterSet::all(), FilterSet::all()),
        Err(BusError::DuplicateName(_))
    ));

    bus.engine.unsubscribe("sql").unwrap();
    bus.subscribe("sql", &[], &[]);
}

#[test]
fn resubscribed_name_starts_empty() {
    let bus = Bus::running(2);
    let sub = bus.subscribe("sql", &[], &[]);
    for i in 0..5 {
        bus.engine.publish(ev(1, i)).unwrap();
    }
    drop(sub);
    assert!(!bus.store.contains("sql"));

    let sub = bus.subscribe("sql", &[], &[]);
    assert_eq!(drain(&sub), Vec::<Event>::new());
}

#[test]
fn infinite_read_ends_with_shutdown() {
    let bus = Bus::running(100);
    let sub = Arc::new(bus.subscribe("sql", &[], &[]));
    let reader = {
        let sub = Arc::clone(&sub);
        thread::spawn(move || sub.read(Deadline::Infinite))
    };

    thread::sleep(Duration::from_millis(20));
    bus.engine.unsubscribe("sql").unwrap();
    assert_eq!(reader.join().unwrap(), ReadOutcome::Shutdown);
}

#[test]
fn publish_after_shutdown_fails() {
    let bus = Bus::running(100);
    bus.engine.shutdown().unwrap();
    assert!(matches!(bus.engine.publish(ev(1, 0)), Err(BusError::Shutdown)));
}
