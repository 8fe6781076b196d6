//! Filter specs

use crate::prelude::*;
use crate::prelude::assert_eq;

#[test]
fn write_filter_keeps_event_out_even_if_read_filter_accepts() {
    let bus = Bus::running(100);
    let sub = bus.subscribe("sql", &[1, 2], &[1]);

    bus.engine.publish(ev(2, 0)).unwrap();
    bus.engine.publish(ev(1, 1)).unwrap();

    assert_eq!(drain(&sub), vec![ev(1, 1)]);
}

#[test]
fn routing_by_write_filter() {
    let bus = Bus::running(100);
    let m1 = bus.subscribe("m1", &[], &[1]);
    let m2 = bus.subscribe("m2", &[], &[2]);

    assert_eq!(bus.engine.publish(ev(1, 0)).unwrap(), 1);

    assert_eq!(m1.read(Deadline::Immediate), ReadOutcome::Event(Arc::new(ev(1, 0))));
    assert_eq!(m2.read(Deadline::Immediate), ReadOutcome::TimedOut);
}

#[test]
fn read_filter_skips_and_discards() {
    let bus = Bus::running(100);
    let sub = bus.subscribe("sql", &[7], &[]);

    bus.engine.publish(ev(9, 0)).unwrap();
    bus.engine.publish(ev(7, 1)).unwrap();
    assert_eq!(drain(&sub), vec![ev(7, 1)]);

    sub.set_read_filter(FilterSet::all());
    assert_eq!(drain(&sub), Vec::<Event>::new());
}

#[test]
fn named_filters_from_registry() {
    let bus = Bus::running(100);
    let registry = bus.engine.events();
    let write = FilterSet::parse("neb:*", registry).unwrap();
    let sub = bus
        .engine
        .subscribe("sql", FilterSet::all(), write)
        .unwrap();

    let host_status = registry.resolve("neb:host_status").unwrap();
    let raw = registry.resolve("internal:raw").unwrap();
    bus.engine.publish(Event::custom(host_status, serde_json::json!({}))).unwrap();
    bus.engine.publish(Event::custom(raw, serde_json::json!({}))).unwrap();

    let seen: Vec<EventType> = drain(&sub).iter().map(|e| e.event_type()).collect();
    assert_eq!(seen, vec![host_status]);
}

#[test]
fn malformed_filter_is_rejected() {
    let bus = Bus::new(100);
    let err = FilterSet::parse("neb:", bus.engine.events()).unwrap_err();
    assert!(matches!(BusError::from(err), BusError::InvalidFilter(_)));
}
