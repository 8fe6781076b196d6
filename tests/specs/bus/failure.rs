//! Persistence failure specs
//!
//! A muxer that cannot spill degrades alone; publishers and other muxers
//! carry on.

use crate::prelude::*;
use crate::prelude::assert_eq;

#[test]
fn disk_full_degrades_only_the_affected_muxer() {
    let bus = Bus::running(100);
    let small = Subscriber::with_capacity(&bus.engine, "small", FilterSet::all(), FilterSet::all(), 2)
        .unwrap();
    let healthy = bus.subscribe("healthy", &[], &[]);

    bus.engine.publish(ev(1, 0)).unwrap();
    bus.engine.publish(ev(1, 1)).unwrap();
    bus.store.fail_writes(true);
    bus.store.fail_create(true);

    // Publisher sees no error, only a smaller delivery count
    assert_eq!(bus.engine.publish(ev(1, 2)).unwrap(), 1);

    let err = small.muxer().write(&Arc::new(ev(1, 3))).unwrap_err();
    assert!(matches!(err, BusError::PersistenceFailure { .. }));

    let stats = small.statistics();
    assert!(stats.degraded);
    assert_eq!(stats.dropped, 2);
    assert_eq!(drain(&small), vec![ev(1, 0), ev(1, 1)]);

    assert!(!healthy.statistics().degraded);
    assert_eq!(drain(&healthy), vec![ev(1, 0), ev(1, 1), ev(1, 2)]);
}

#[test]
fn degraded_muxer_keeps_serving_spilled_events() {
    let bus = Bus::running(1);
    let sub = bus.subscribe("sql", &[], &[]);
    bus.engine.publish(ev(1, 0)).unwrap();
    bus.engine.publish(ev(1, 1)).unwrap();

    bus.store.fail_writes(true);
    assert_eq!(bus.engine.publish(ev(1, 2)).unwrap(), 0);

    assert_eq!(drain(&sub), vec![ev(1, 0), ev(1, 1)]);
    assert_eq!(sub.statistics().dropped, 1);
}
