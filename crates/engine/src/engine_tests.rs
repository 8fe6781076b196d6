// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{ReadOutcome, Stream};
use mbus_core::{Deadline, EventType, Payload};
use mbus_storage::{FakeSpillStore, Spill, StorageError};
use proptest::prelude::*;
use serde_json::json;
use std::sync::{Condvar, Mutex};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn engine_with(store: &FakeSpillStore, capacity: usize) -> Engine {
    Engine::with_store(
        BusConfig::new("unused").with_memory_capacity(capacity),
        EventRegistry::builtin().unwrap(),
        Arc::new(store.clone()),
    )
    .unwrap()
}

fn engine(store: &FakeSpillStore) -> Engine {
    engine_with(store, 100)
}

fn only(types: &[u32]) -> FilterSet {
    FilterSet::only(types.iter().map(|t| EventType::from_raw(*t)))
}

fn event(event_type: u32, seq: u64) -> Event {
    Event::custom(EventType::from_raw(event_type), json!(seq))
}

fn drain(sub: &Subscriber) -> Vec<Event> {
    std::iter::from_fn(|| sub.try_read())
        .map(|e| Event::clone(&e))
        .collect()
}

#[derive(Default)]
struct GateState {
    entered: bool,
    released: bool,
}

/// Holds every spill removal until released
#[derive(Default)]
struct Gate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl Gate {
    fn pass(&self) {
        let mut state = self.state.lock().unwrap();
        state.entered = true;
        self.changed.notify_all();
        while !state.released {
            state = self.changed.wait(state).unwrap();
        }
    }

    fn wait_entered(&self) {
        let mut state = self.state.lock().unwrap();
        while !state.entered {
            state = self.changed.wait(state).unwrap();
        }
    }

    fn release(&self) {
        self.state.lock().unwrap().released = true;
        self.changed.notify_all();
    }
}

struct GatedStore {
    inner: FakeSpillStore,
    gate: Arc<Gate>,
}

impl GatedStore {
    fn wrap(&self, spill: Box<dyn Spill>) -> Box<dyn Spill> {
        Box::new(GatedSpill {
            inner: spill,
            gate: Arc::clone(&self.gate),
        })
    }
}

impl SpillStore for GatedStore {
    fn open(&self, name: &str) -> Result<Option<Box<dyn Spill>>, StorageError> {
        Ok(self.inner.open(name)?.map(|spill| self.wrap(spill)))
    }

    fn create(&self, name: &str) -> Result<Box<dyn Spill>, StorageError> {
        Ok(self.wrap(self.inner.create(name)?))
    }

    fn retain(
        &self,
        name: &str,
        head: &[SharedEvent],
        tail: Option<Box<dyn Spill>>,
    ) -> Result<usize, StorageError> {
        self.inner.retain(name, head, tail)
    }

    fn discard(&self, name: &str) -> Result<(), StorageError> {
        self.inner.discard(name)
    }
}

struct GatedSpill {
    inner: Box<dyn Spill>,
    gate: Arc<Gate>,
}

impl Spill for GatedSpill {
    fn push(&mut self, event: &Event) -> Result<(), StorageError> {
        self.inner.push(event)
    }

    fn pop(&mut self) -> Result<Option<Event>, StorageError> {
        self.inner.pop()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn remove(self: Box<Self>) -> Result<(), StorageError> {
        self.gate.pass();
        self.inner.remove()
    }
}

#[test]
fn new_engine_is_stopped() {
    let engine = engine(&FakeSpillStore::new());
    assert_eq!(engine.state(), EngineState::Stopped);
}

#[test]
fn publish_while_stopped_is_delivered_on_start() {
    let engine = engine(&FakeSpillStore::new());
    let publisher = engine.publisher();
    assert_eq!(publisher.write(event(7, 0)).unwrap(), 0);
    assert_eq!(publisher.write(event(9, 1)).unwrap(), 0);
    assert_eq!(engine.statistics().pending, 2);

    let sub = engine.subscribe("sql", only(&[7, 9]), only(&[7, 9])).unwrap();
    assert_eq!(sub.statistics().state, MuxerState::NotStarted);
    assert!(sub.try_read().is_none());

    engine.start().unwrap();
    assert_eq!(drain(&sub), vec![event(7, 0), event(9, 1)]);
    assert_eq!(engine.statistics().pending, 0);
    assert_eq!(sub.statistics().state, MuxerState::Running);
}

#[test]
fn stopped_buffer_overflows_to_storage() {
    let store = FakeSpillStore::new();
    let engine = engine_with(&store, 2);
    let published: Vec<Event> = (0..50).map(|i| event(7, i)).collect();
    for e in &published {
        assert_eq!(engine.publish(e.clone()).unwrap(), 0);
    }

    assert_eq!(engine.statistics().pending, 50);
    assert_eq!(store.creates(), 1);
    assert_eq!(store.backlog(PENDING_QUEUE).len(), 48);

    let sub = engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();
    engine.start().unwrap();
    assert_eq!(engine.statistics().pending, 0);
    assert!(!store.contains(PENDING_QUEUE));
    assert_eq!(drain(&sub), published);
}

#[test]
fn stopped_buffer_survives_crash() {
    let store = FakeSpillStore::new();
    store.seed(PENDING_QUEUE, vec![event(7, 0), event(7, 1)]);

    let engine = engine_with(&store, 2);
    assert_eq!(engine.statistics().pending, 2);
    let sub = engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();
    engine.start().unwrap();
    assert_eq!(drain(&sub), vec![event(7, 0), event(7, 1)]);
}

#[test]
fn pending_queue_name_is_reserved() {
    let engine = engine(&FakeSpillStore::new());
    let err = engine
        .subscribe(PENDING_QUEUE, FilterSet::all(), FilterSet::all())
        .unwrap_err();
    assert!(matches!(err, BusError::DuplicateName(_)));
}

#[test]
fn start_is_idempotent() {
    let engine = engine(&FakeSpillStore::new());
    engine.publish(event(7, 0)).unwrap();
    let sub = engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();

    engine.start().unwrap();
    engine.start().unwrap();
    assert_eq!(engine.state(), EngineState::Running);
    assert_eq!(drain(&sub), vec![event(7, 0)]);
}

#[test]
fn stop_buffers_new_publishes_but_keeps_queues_readable() {
    let engine = engine(&FakeSpillStore::new());
    let sub = engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();
    engine.start().unwrap();
    assert_eq!(engine.publish(event(7, 0)).unwrap(), 1);

    engine.stop().unwrap();
    assert_eq!(sub.statistics().state, MuxerState::Stopped);
    assert_eq!(engine.publish(event(7, 1)).unwrap(), 0);
    assert_eq!(drain(&sub), vec![event(7, 0)]);

    engine.start().unwrap();
    assert_eq!(drain(&sub), vec![event(7, 1)]);
}

#[test]
fn write_filters_route_events() {
    let engine = engine(&FakeSpillStore::new());
    engine.start().unwrap();
    let m1 = engine.subscribe("m1", FilterSet::all(), only(&[1])).unwrap();
    let m2 = engine.subscribe("m2", FilterSet::all(), only(&[2])).unwrap();

    assert_eq!(engine.publish(event(1, 0)).unwrap(), 1);
    assert_eq!(m1.read(Deadline::Immediate), ReadOutcome::Event(event(1, 0).into_shared()));
    assert_eq!(m2.read(Deadline::Immediate), ReadOutcome::TimedOut);
}

#[test]
fn publish_with_no_subscribers_reaches_nobody() {
    let engine = engine(&FakeSpillStore::new());
    engine.start().unwrap();
    assert_eq!(engine.publish(event(1, 0)).unwrap(), 0);
}

#[test]
fn duplicate_name_is_rejected() {
    let engine = engine(&FakeSpillStore::new());
    let _sub = engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();
    let err = engine
        .subscribe("sql", FilterSet::all(), FilterSet::all())
        .unwrap_err();
    assert!(matches!(err, BusError::DuplicateName(name) if name == "sql"));
}

#[test]
fn resubscribe_after_drop_starts_empty() {
    let engine = engine(&FakeSpillStore::new());
    engine.start().unwrap();
    let sub = engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();
    engine.publish(event(7, 0)).unwrap();
    drop(sub);
    assert!(engine.muxer_names().is_empty());

    let sub = engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();
    assert!(sub.try_read().is_none());
}

#[test]
fn unsubscribe_discards_backlog_and_wakes_reader() {
    let store = FakeSpillStore::new();
    let engine = engine_with(&store, 1);
    engine.start().unwrap();
    let sub = Arc::new(engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap());
    engine.publish(event(7, 0)).unwrap();
    engine.publish(event(7, 1)).unwrap();
    assert!(store.contains("sql"));

    assert!(engine.unsubscribe("sql").unwrap());
    assert!(!store.contains("sql"));
    assert_eq!(sub.read(Deadline::Infinite), ReadOutcome::Shutdown);
    assert_eq!(engine.publish(event(7, 2)).unwrap(), 0);
    assert!(!engine.unsubscribe("sql").unwrap());
}

#[test]
fn resubscribe_while_unsubscribe_discards_starts_empty() {
    let gate = Arc::new(Gate::default());
    let store = GatedStore {
        inner: FakeSpillStore::new(),
        gate: Arc::clone(&gate),
    };
    let engine = Engine::with_store(
        BusConfig::new("unused").with_memory_capacity(2),
        EventRegistry::builtin().unwrap(),
        Arc::new(store),
    )
    .unwrap();
    engine.start().unwrap();
    let old = engine.subscribe("a", FilterSet::all(), FilterSet::all()).unwrap();
    for i in 0..6 {
        engine.publish(event(7, i)).unwrap();
    }
    assert_eq!(old.statistics().file_count, 4);

    let unsubscriber = {
        let engine = engine.clone();
        thread::spawn(move || engine.unsubscribe("a").unwrap())
    };
    gate.wait_entered();

    let resubscriber = {
        let engine = engine.clone();
        thread::spawn(move || {
            let sub = engine.subscribe("a", FilterSet::all(), FilterSet::all()).unwrap();
            let queued = sub.statistics().queued_count;
            engine.publish(event(7, 100)).unwrap();
            (queued, drain(&sub))
        })
    };
    thread::sleep(Duration::from_millis(20));
    gate.release();

    assert!(unsubscriber.join().unwrap());
    let (queued, drained) = resubscriber.join().unwrap();
    assert_eq!(queued, 0);
    assert_eq!(drained, vec![event(7, 100)]);
    assert_eq!(old.read(Deadline::Immediate), ReadOutcome::Shutdown);
}

#[test]
fn stale_subscriber_drop_leaves_new_registration_alone() {
    let engine = engine(&FakeSpillStore::new());
    engine.start().unwrap();
    let old = engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();
    engine.unsubscribe("sql").unwrap();
    let new = engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();

    drop(old);
    assert_eq!(engine.muxer_names(), vec!["sql".to_string()]);
    assert_eq!(engine.publish(event(7, 0)).unwrap(), 1);
    assert_eq!(drain(&new), vec![event(7, 0)]);
}

#[test]
fn persistence_failure_is_isolated_per_muxer() {
    let store = FakeSpillStore::new();
    let engine = engine(&store);
    engine.start().unwrap();
    let small =
        Subscriber::with_capacity(&engine, "small", FilterSet::all(), FilterSet::all(), 1).unwrap();
    let large = engine.subscribe("large", FilterSet::all(), FilterSet::all()).unwrap();
    store.fail_create(true);

    assert_eq!(engine.publish(event(7, 0)).unwrap(), 2);
    assert_eq!(engine.publish(event(7, 1)).unwrap(), 1);

    assert!(small.statistics().degraded);
    assert_eq!(small.statistics().dropped, 1);
    assert_eq!(drain(&small), vec![event(7, 0)]);
    assert!(!large.statistics().degraded);
    assert_eq!(drain(&large), vec![event(7, 0), event(7, 1)]);
}

#[test]
fn shutdown_retains_residue_ahead_of_file_backlog() {
    let store = FakeSpillStore::new();
    let engine = engine_with(&store, 2);
    engine.start().unwrap();
    let sub = engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();
    for i in 0..5 {
        engine.publish(event(7, i)).unwrap();
    }

    engine.shutdown().unwrap();
    let expected: Vec<_> = (0..5).map(|i| event(7, i)).collect();
    assert_eq!(store.backlog("sql"), expected);
    assert_eq!(sub.read(Deadline::Immediate), ReadOutcome::Shutdown);

    // Dropping the subscriber after shutdown keeps the backlog
    drop(sub);
    assert_eq!(store.backlog("sql").len(), 5);
}

#[test]
fn failed_retain_reports_lost_residue_and_keeps_file_backlog() {
    let store = FakeSpillStore::new();
    let engine = engine_with(&store, 2);
    engine.start().unwrap();
    let sub = engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();
    for i in 0..5 {
        engine.publish(event(7, i)).unwrap();
    }
    store.fail_writes(true);

    let err = engine.shutdown().unwrap_err();
    assert!(matches!(
        &err,
        BusError::PersistenceFailure { muxer, reason }
            if muxer == "sql" && reason.starts_with("2 queued events lost")
    ));
    assert_eq!(engine.state(), EngineState::Shutdown);
    assert_eq!(sub.read(Deadline::Immediate), ReadOutcome::Shutdown);
    assert_eq!(
        store.backlog("sql"),
        vec![event(7, 2), event(7, 3), event(7, 4)]
    );
}

#[test]
fn shutdown_flushes_buffered_events() {
    let store = FakeSpillStore::new();
    let engine = engine(&store);
    let _sub = engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();
    engine.publish(event(7, 0)).unwrap();

    engine.shutdown().unwrap();
    assert_eq!(store.backlog("sql"), vec![event(7, 0)]);
}

#[test]
fn operations_after_shutdown_fail() {
    let engine = engine(&FakeSpillStore::new());
    engine.shutdown().unwrap();
    engine.shutdown().unwrap();

    assert_eq!(engine.state(), EngineState::Shutdown);
    assert!(matches!(engine.publish(event(7, 0)), Err(BusError::Shutdown)));
    assert!(matches!(
        engine.subscribe("sql", FilterSet::all(), FilterSet::all()),
        Err(BusError::Shutdown)
    ));
    assert!(matches!(engine.start(), Err(BusError::Shutdown)));
    assert!(matches!(engine.stop(), Err(BusError::Shutdown)));
}

#[test]
fn shutdown_wakes_blocked_reader() {
    let engine = engine(&FakeSpillStore::new());
    let sub = Arc::new(engine.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap());
    let reader = {
        let sub = Arc::clone(&sub);
        thread::spawn(move || sub.read(Deadline::Infinite))
    };
    thread::sleep(Duration::from_millis(20));
    engine.shutdown().unwrap();

    assert_eq!(reader.join().unwrap(), ReadOutcome::Shutdown);
}

#[test]
fn overflow_survives_restart() {
    let dir = TempDir::new().unwrap();
    let config = BusConfig::new(dir.path()).with_memory_capacity(2);
    let expected: Vec<_> = (0..10).map(|i| event(7, i)).collect();

    let first = Engine::init(config.clone()).unwrap();
    first.start().unwrap();
    let sub = first.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();
    for e in &expected {
        first.publish(e.clone()).unwrap();
    }
    // Consume one so the restart resumes mid-queue
    assert_eq!(sub.try_read().map(|e| Event::clone(&e)), Some(event(7, 0)));
    first.shutdown().unwrap();
    drop(sub);

    let second = Engine::init(config).unwrap();
    second.start().unwrap();
    let sub = second.subscribe("sql", FilterSet::all(), FilterSet::all()).unwrap();
    assert_eq!(sub.statistics().file_count, 9);
    assert_eq!(drain(&sub), expected[1..].to_vec());

    drop(sub);
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
fn concurrent_publishers_keep_consistent_order() {
    const THREADS: u64 = 4;
    const PER_THREAD: u64 = 200;

    let engine = engine_with(&FakeSpillStore::new(), 16);
    engine.start().unwrap();
    let a = engine.subscribe("a", FilterSet::all(), FilterSet::all()).unwrap();
    let b = engine.subscribe("b", FilterSet::all(), FilterSet::all()).unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let publisher = engine.publisher();
            thread::spawn(move || {
                for seq in 0..PER_THREAD {
                    publisher
                        .write(Event::custom(EventType::from_raw(1), json!([t, seq])))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let seen_a = drain(&a);
    let seen_b = drain(&b);
    assert_eq!(seen_a.len() as u64, THREADS * PER_THREAD);
    assert_eq!(seen_a, seen_b);

    // Each publisher's events appear in its own write order
    let mut last = vec![None; THREADS as usize];
    for e in &seen_a {
        let Payload::Custom(value) = e.payload() else {
            panic!("unexpected payload {:?}", e.payload());
        };
        let t = value[0].as_u64().unwrap() as usize;
        let seq = value[1].as_u64().unwrap();
        assert!(last[t].map_or(true, |prev| prev < seq));
        last[t] = Some(seq);
    }
}

#[test]
fn subscribe_and_unsubscribe_race_with_publish() {
    let engine = engine(&FakeSpillStore::new());
    engine.start().unwrap();

    let publisher = {
        let publisher = engine.publisher();
        thread::spawn(move || {
            for i in 0..500 {
                publisher.write(event(7, i)).unwrap();
            }
        })
    };
    for round in 0..50 {
        let sub = engine
            .subscribe(&format!("s{}", round % 3), FilterSet::all(), FilterSet::all())
            .unwrap();
        let received = drain(&sub);
        let seqs: Vec<u64> = received
            .iter()
            .filter_map(|e| match e.payload() {
                Payload::Custom(v) => v.as_u64(),
                _ => None,
            })
            .collect();
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
    }
    publisher.join().unwrap();
    assert!(engine.muxer_names().is_empty());
}

#[test]
fn statistics_cover_every_muxer() {
    let engine = engine(&FakeSpillStore::new());
    let _a = engine.subscribe("a", FilterSet::all(), only(&[1])).unwrap();
    let _b = engine.subscribe("b", FilterSet::all(), FilterSet::all()).unwrap();
    engine.start().unwrap();
    engine.publish(event(1, 0)).unwrap();
    engine.publish(event(2, 1)).unwrap();

    let stats = engine.statistics();
    assert_eq!(stats.state, EngineState::Running);
    assert_eq!(stats.muxers["a"].queued_count, 1);
    assert_eq!(stats.muxers["b"].queued_count, 2);
}

#[test]
fn publisher_cannot_read() {
    let engine = engine(&FakeSpillStore::new());
    let publisher = engine.publisher();
    assert!(matches!(
        Stream::read(&publisher, Deadline::Immediate),
        Err(BusError::UnsupportedOperation(_))
    ));
    assert_eq!(Stream::write(&publisher, event(1, 0)).unwrap(), 0);
}

#[test]
fn zero_capacity_is_rejected() {
    let engine = engine(&FakeSpillStore::new());
    let err = Subscriber::with_capacity(&engine, "sql", FilterSet::all(), FilterSet::all(), 0)
        .unwrap_err();
    assert!(matches!(err, BusError::Config(_)));
}

proptest! {
    #[test]
    fn each_muxer_sees_its_filtered_subsequence(types in prop::collection::vec(1u32..4, 0..60)) {
        let engine = engine_with(&FakeSpillStore::new(), 4);
        engine.start().unwrap();
        let odd = engine.subscribe("odd", FilterSet::all(), only(&[1, 3])).unwrap();
        let two = engine.subscribe("two", FilterSet::all(), only(&[2])).unwrap();

        let published: Vec<Event> = types
            .iter()
            .enumerate()
            .map(|(i, t)| event(*t, i as u64))
            .collect();
        for e in &published {
            engine.publish(e.clone()).unwrap();
        }

        let want = |accept: &[u32]| -> Vec<Event> {
            published
                .iter()
                .filter(|e| accept.contains(&e.event_type().value()))
                .cloned()
                .collect()
        };
        prop_assert_eq!(drain(&odd), want(&[1, 3]));
        prop_assert_eq!(drain(&two), want(&[2]));
    }
}
