//! Overflow specs
//!
//! Events beyond memory capacity go to a queue file and come back in order,
//! including after the process restarts.

use crate::prelude::*;
use crate::prelude::assert_eq;

#[test]
fn overflow_round_trips_in_order() {
    let dir = TempDir::new().unwrap();
    let engine = disk_engine(dir.path(), 4);
    engine.start().unwrap();
    let sub = engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();

    let published: Vec<Event> = (0..50).map(|i| ev(1, i)).collect();
    for e in &published {
        engine.publish(e.clone()).unwrap();
    }
    let stats = sub.statistics();
    assert_eq!(stats.memory_count, 4);
    assert_eq!(stats.file_count, 46);

    assert_eq!(drain(&sub), published);
    // The drained queue file is removed
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn overflow_survives_restart() {
    let dir = TempDir::new().unwrap();
    let published: Vec<Event> = (0..30).map(|i| ev(1, i)).collect();

    {
        let engine = disk_engine(dir.path(), 5);
        engine.start().unwrap();
        let _sub = engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();
        for e in &published {
            engine.publish(e.clone()).unwrap();
        }
        engine.shutdown().unwrap();
    }

    let engine = disk_engine(dir.path(), 5);
    engine.start().unwrap();
    let sub = engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();
    assert_eq!(sub.statistics().queued_count, 30);
    assert_eq!(drain(&sub), published);
}

#[test]
fn restart_after_crash_keeps_file_backlog() {
    let dir = TempDir::new().unwrap();
    let published: Vec<Event> = (0..10).map(|i| ev(1, i)).collect();

    // No shutdown: only what reached the queue file survives
    let engine = disk_engine(dir.path(), 3);
    engine.start().unwrap();
    let sub = engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();
    for e in &published {
        engine.publish(e.clone()).unwrap();
    }
    std::mem::forget(sub);

    let engine = disk_engine(dir.path(), 3);
    engine.start().unwrap();
    let sub = engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();
    assert_eq!(drain(&sub), published[3..].to_vec());
}

#[test]
fn publishes_while_stopped_spill_to_disk() {
    let dir = TempDir::new().unwrap();
    let engine = disk_engine(dir.path(), 3);
    let published: Vec<Event> = (0..20).map(|i| ev(1, i)).collect();
    for e in &published {
        assert_eq!(engine.publish(e.clone()).unwrap(), 0);
    }
    assert_eq!(engine.statistics().pending, 20);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

    let sub = engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();
    engine.start().unwrap();
    assert_eq!(drain(&sub), published);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
