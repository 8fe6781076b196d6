// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consumer handle
//!
//! A subscriber owns its muxer. Dropping the subscriber unregisters the muxer
//! and discards its unread backlog; drain first if the backlog matters, or
//! shut the engine down, which retains it instead.

use crate::engine::Engine;
use crate::error::BusError;
use crate::muxer::{Muxer, MuxerStats, ReadOutcome};
use crate::stream::Stream;
use mbus_core::{Deadline, Event, FilterSet, SharedEvent, SubscriberConfig};
use std::sync::Arc;

/// Read-only endpoint bound to one named muxer
#[derive(Debug)]
pub struct Subscriber {
    engine: Engine,
    muxer: Arc<Muxer>,
}

impl Subscriber {
    /// Register a muxer under `name` with the engine's default capacity
    pub fn new(
        engine: &Engine,
        name: &str,
        read_filter: FilterSet,
        write_filter: FilterSet,
    ) -> Result<Self, BusError> {
        let capacity = engine.config().memory_capacity;
        Self::with_capacity(engine, name, read_filter, write_filter, capacity)
    }

    pub fn with_capacity(
        engine: &Engine,
        name: &str,
        read_filter: FilterSet,
        write_filter: FilterSet,
        capacity: usize,
    ) -> Result<Self, BusError> {
        let muxer = engine.register(name, read_filter, write_filter, capacity)?;
        Ok(Self {
            engine: engine.clone(),
            muxer,
        })
    }

    /// Register a muxer from a `[[subscriber]]` config entry
    ///
    /// Filter strings are resolved against the engine's event registry.
    pub fn from_config(engine: &Engine, config: &SubscriberConfig) -> Result<Self, BusError> {
        let read_filter = FilterSet::parse(&config.read_filter, engine.events())?;
        let write_filter = FilterSet::parse(&config.write_filter, engine.events())?;
        let capacity = config
            .memory_capacity
            .unwrap_or(engine.config().memory_capacity);
        Self::with_capacity(engine, &config.name, read_filter, write_filter, capacity)
    }

    pub fn name(&self) -> &str {
        self.muxer.name()
    }

    /// The underlying muxer, for filter changes and direct reads
    pub fn muxer(&self) -> &Muxer {
        &self.muxer
    }

    pub fn read(&self, deadline: Deadline) -> ReadOutcome {
        self.muxer.read(deadline)
    }

    /// Read with the configured `read_timeout`
    pub fn next(&self) -> ReadOutcome {
        self.muxer
            .read(Deadline::after(self.engine.config().read_timeout))
    }

    /// Next event if one is queued right now
    pub fn try_read(&self) -> Option<SharedEvent> {
        self.muxer.read(Deadline::Immediate).into_event()
    }

    pub fn set_read_filter(&self, filter: FilterSet) {
        self.muxer.set_read_filter(filter);
    }

    pub fn set_write_filter(&self, filter: FilterSet) {
        self.muxer.set_write_filter(filter);
    }

    pub fn statistics(&self) -> MuxerStats {
        self.muxer.statistics()
    }
}

impl Stream for Subscriber {
    fn read(&self, deadline: Deadline) -> Result<ReadOutcome, BusError> {
        Ok(Subscriber::read(self, deadline))
    }

    fn write(&self, _event: Event) -> Result<usize, BusError> {
        Err(BusError::UnsupportedOperation("cannot write to a subscriber"))
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.engine.detach(&self.muxer);
    }
}

#[cfg(test)]
#[path = "subscriber_tests.rs"]
mod tests;
