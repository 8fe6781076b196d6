//! Shared fixtures for bus specs

#![allow(dead_code, unused_imports)]

pub use mbus_core::{BusConfig, Deadline, Event, EventRegistry, EventType, FilterSet};
pub use mbus_engine::{BusError, Engine, EngineState, ReadOutcome, Subscriber};
pub use mbus_storage::FakeSpillStore;
pub use similar_asserts::assert_eq;
pub use std::sync::Arc;
pub use tempfile::TempDir;

/// Engine over an in-memory spill store
pub struct Bus {
    pub engine: Engine,
    pub store: FakeSpillStore,
}

impl Bus {
    pub fn new(capacity: usize) -> Self {
        let store = FakeSpillStore::new();
        let engine = Engine::with_store(
            BusConfig::new("unused").with_memory_capacity(capacity),
            EventRegistry::builtin().unwrap(),
            Arc::new(store.clone()),
        )
        .unwrap();
        Self { engine, store }
    }

    pub fn running(capacity: usize) -> Self {
        let bus = Self::new(capacity);
        bus.engine.start().unwrap();
        bus
    }

    pub fn subscribe(&self, name: &str, read: &[u32], write: &[u32]) -> Subscriber {
        self.engine
            .subscribe(name, types(read), types(write))
            .unwrap()
    }
}

/// Engine over a real queue directory
pub fn disk_engine(dir: &std::path::Path, capacity: usize) -> Engine {
    Engine::init(BusConfig::new(dir).with_memory_capacity(capacity)).unwrap()
}

/// Filter accepting exactly `values`; an empty slice accepts everything
pub fn types(values: &[u32]) -> FilterSet {
    if values.is_empty() {
        return FilterSet::all();
    }
    FilterSet::only(values.iter().map(|v| EventType::from_raw(*v)))
}

/// Event of type `event_type` carrying `seq`
pub fn ev(event_type: u32, seq: u64) -> Event {
    Event::custom(EventType::from_raw(event_type), serde_json::json!(seq))
}

/// Everything readable right now
pub fn drain(sub: &Subscriber) -> Vec<Event> {
    std::iter::from_fn(|| sub.try_read())
        .map(|e| Event::clone(&e))
        .collect()
}
