// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out engine
//!
//! The engine owns the registry of muxers and delivers every published event
//! to each registered muxer whose write filter accepts it. Publishes take the
//! registry read lock, so they run concurrently; subscribe, unsubscribe and
//! lifecycle changes take the write lock.
//!
//! A publish locks all of its target queues, in name order, before
//! appending. Two overlapping publishes therefore land in the same relative
//! order in every muxer that accepts both.
//!
//! Publishes made while stopped go to an engine-owned muxer. It is bounded by
//! the configured memory capacity and spills to overflow storage like any
//! other, so a restart after a crash picks the buffer back up.

use crate::error::BusError;
use crate::muxer::{Muxer, MuxerState, MuxerStats, ReadOutcome};
use crate::publisher::Publisher;
use crate::subscriber::Subscriber;
use mbus_core::{BusConfig, Deadline, Event, EventRegistry, FilterSet, SharedEvent};
use mbus_storage::{QueueDir, Spill, SpillStore};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

/// Queue name reserved for events published while the engine is stopped
pub const PENDING_QUEUE: &str = "mbus.pending";

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Publishes are buffered until start
    Stopped,
    Running,
    /// Terminal; every operation fails with `Shutdown`
    Shutdown,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Stopped => "stopped",
            EngineState::Running => "running",
            EngineState::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

/// Engine-wide snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub state: EngineState,
    /// Events buffered while stopped
    pub pending: usize,
    pub muxers: BTreeMap<String, MuxerStats>,
}

struct Registry {
    state: EngineState,
    muxers: BTreeMap<String, Weak<Muxer>>,
}

struct EngineInner {
    config: BusConfig,
    events: Arc<EventRegistry>,
    store: Arc<dyn SpillStore>,
    /// Only touched under the registry write lock
    pending: Muxer,
    registry: RwLock<Registry>,
}

/// Handle to a bus instance
///
/// Cheap to clone; every clone refers to the same registry. Independent
/// engines share nothing, apart from the queue directory if configured so.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Engine with built-in event kinds and file-backed overflow
    pub fn init(config: BusConfig) -> Result<Self, BusError> {
        Self::with_registry(config, EventRegistry::builtin()?)
    }

    /// Engine with a caller-built event registry and file-backed overflow
    pub fn with_registry(config: BusConfig, events: EventRegistry) -> Result<Self, BusError> {
        let store = QueueDir::new(&config.queue_dir, config.sync_writes);
        Self::with_store(config, events, Arc::new(store))
    }

    pub fn with_store(
        config: BusConfig,
        events: EventRegistry,
        store: Arc<dyn SpillStore>,
    ) -> Result<Self, BusError> {
        config.validate()?;
        tracing::info!(
            queue_dir = %config.queue_dir.display(),
            memory_capacity = config.memory_capacity,
            event_types = events.len(),
            "engine initialized"
        );
        let pending = Muxer::new(
            PENDING_QUEUE,
            config.memory_capacity,
            FilterSet::all(),
            FilterSet::all(),
            Arc::clone(&store),
            MuxerState::NotStarted,
        );
        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                events: Arc::new(events),
                store,
                pending,
                registry: RwLock::new(Registry {
                    state: EngineState::Stopped,
                    muxers: BTreeMap::new(),
                }),
            }),
        })
    }

    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    pub fn events(&self) -> &EventRegistry {
        &self.inner.events
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.inner.registry.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.inner
            .registry
            .write()
            .unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> EngineState {
        self.read().state
    }

    /// Begin dispatching; buffered events go out in publish order
    ///
    /// Calling `start` on a running engine does nothing.
    pub fn start(&self) -> Result<(), BusError> {
        let mut registry = self.write();
        match registry.state {
            EngineState::Running => return Ok(()),
            EngineState::Shutdown => return Err(BusError::Shutdown),
            EngineState::Stopped => {}
        }

        let flushed = self.flush_pending(&registry);
        set_muxer_states(&registry.muxers, MuxerState::Running);
        registry.state = EngineState::Running;
        tracing::info!(flushed, muxers = registry.muxers.len(), "engine started");
        Ok(())
    }

    /// Stop dispatching
    ///
    /// Waits for publishes already fanning out. Queued events stay readable.
    pub fn stop(&self) -> Result<(), BusError> {
        let mut registry = self.write();
        match registry.state {
            EngineState::Stopped => return Ok(()),
            EngineState::Shutdown => return Err(BusError::Shutdown),
            EngineState::Running => {}
        }
        set_muxer_states(&registry.muxers, MuxerState::Stopped);
        registry.state = EngineState::Stopped;
        tracing::info!("engine stopped");
        Ok(())
    }

    /// Tear the engine down
    ///
    /// Buffered events are delivered first. Each muxer's remaining queue is
    /// then written to overflow storage, memory residue ahead of the file
    /// backlog, so an engine built on the same store resumes it. Waiting
    /// readers get `Shutdown`.
    ///
    /// The engine is shut down even when a queue cannot be retained. The
    /// first such failure is returned as `PersistenceFailure`, naming how
    /// many in-memory events were lost; the file backlog is left as it was.
    pub fn shutdown(&self) -> Result<(), BusError> {
        let mut registry = self.write();
        if registry.state == EngineState::Shutdown {
            return Ok(());
        }

        self.flush_pending(&registry);
        let mut failure = None;
        let (residue, backlog) = self.inner.pending.close();
        if !residue.is_empty() || backlog.is_some() {
            if let Err(e) = self.retain(&self.inner.pending, residue, backlog) {
                failure = Some(e);
            }
        }

        let muxers = std::mem::take(&mut registry.muxers);
        for muxer in muxers.values().filter_map(Weak::upgrade) {
            let (head, tail) = muxer.close();
            if let Err(e) = self.retain(&muxer, head, tail) {
                failure.get_or_insert(e);
            }
        }

        registry.state = EngineState::Shutdown;
        tracing::info!("engine shut down");
        failure.map_or(Ok(()), Err)
    }

    fn retain(
        &self,
        muxer: &Muxer,
        head: Vec<SharedEvent>,
        tail: Option<Box<dyn Spill>>,
    ) -> Result<(), BusError> {
        match self.inner.store.retain(muxer.name(), &head, tail) {
            Ok(0) => Ok(()),
            Ok(retained) => {
                tracing::info!(muxer = %muxer.name(), retained, "queue retained");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    muxer = %muxer.name(),
                    error = %e,
                    lost = head.len(),
                    "failed to retain queue; in-memory events lost"
                );
                Err(BusError::PersistenceFailure {
                    muxer: muxer.name().to_string(),
                    reason: format!("{} queued events lost: {}", head.len(), e),
                })
            }
        }
    }

    /// Hand everything published while stopped to the registered muxers
    fn flush_pending(&self, registry: &Registry) -> usize {
        let mut flushed = 0;
        while let ReadOutcome::Event(event) = self.inner.pending.read(Deadline::Immediate) {
            fan_out(&registry.muxers, &event);
            flushed += 1;
        }
        flushed
    }

    /// Deliver `event` to every muxer whose write filter accepts it
    ///
    /// Returns the number of muxers that enqueued it. While stopped the event
    /// is buffered and 0 is returned. A muxer failing to persist the event is
    /// logged and left out of the count; other muxers are unaffected. An
    /// event the stopped buffer cannot persist is logged and dropped.
    pub fn publish(&self, event: Event) -> Result<usize, BusError> {
        let event = event.into_shared();
        {
            let registry = self.read();
            match registry.state {
                EngineState::Running => return Ok(fan_out(&registry.muxers, &event)),
                EngineState::Shutdown => return Err(BusError::Shutdown),
                EngineState::Stopped => {}
            }
        }

        // State may have changed between the two locks
        let registry = self.write();
        match registry.state {
            EngineState::Running => Ok(fan_out(&registry.muxers, &event)),
            EngineState::Shutdown => Err(BusError::Shutdown),
            EngineState::Stopped => {
                match self.inner.pending.write(&event) {
                    Ok(_) => {
                        tracing::debug!(event_type = %event.event_type(), "engine stopped; event buffered");
                    }
                    Err(e) => {
                        tracing::warn!(
                            event_type = %event.event_type(),
                            error = %e,
                            "engine stopped; event could not be buffered"
                        );
                    }
                }
                Ok(0)
            }
        }
    }

    pub fn publisher(&self) -> Publisher {
        Publisher::new(self)
    }

    /// Register a consumer under `name` with the default memory capacity
    pub fn subscribe(
        &self,
        name: &str,
        read_filter: FilterSet,
        write_filter: FilterSet,
    ) -> Result<Subscriber, BusError> {
        Subscriber::new(self, name, read_filter, write_filter)
    }

    pub(crate) fn register(
        &self,
        name: &str,
        read_filter: FilterSet,
        write_filter: FilterSet,
        capacity: usize,
    ) -> Result<Arc<Muxer>, BusError> {
        if capacity == 0 {
            return Err(mbus_core::ConfigError::ZeroCapacity(name.to_string()).into());
        }
        if name == PENDING_QUEUE {
            return Err(BusError::DuplicateName(name.to_string()));
        }

        let mut registry = self.write();
        let state = match registry.state {
            EngineState::Shutdown => return Err(BusError::Shutdown),
            EngineState::Running => MuxerState::Running,
            EngineState::Stopped => MuxerState::NotStarted,
        };
        if registry
            .muxers
            .get(name)
            .and_then(Weak::upgrade)
            .is_some_and(|m| m.state() != MuxerState::Shutdown)
        {
            return Err(BusError::DuplicateName(name.to_string()));
        }

        let muxer = Arc::new(Muxer::new(
            name,
            capacity,
            read_filter,
            write_filter,
            Arc::clone(&self.inner.store),
            state,
        ));
        registry
            .muxers
            .insert(name.to_string(), Arc::downgrade(&muxer));
        tracing::info!(
            muxer = name,
            read_filter = %muxer.read_filter(),
            write_filter = %muxer.write_filter(),
            capacity,
            "muxer subscribed"
        );
        Ok(muxer)
    }

    /// Remove `name` from the registry and discard its backlog
    ///
    /// Returns false when no such muxer is registered. Readers blocked on the
    /// muxer get `Shutdown`. The backlog is gone before the name can be
    /// registered again.
    pub fn unsubscribe(&self, name: &str) -> Result<bool, BusError> {
        let mut registry = self.write();
        if registry.state == EngineState::Shutdown {
            return Err(BusError::Shutdown);
        }
        let Some(weak) = registry.muxers.remove(name) else {
            return Ok(false);
        };
        if let Some(muxer) = weak.upgrade() {
            self.discard(&muxer);
        }
        Ok(true)
    }

    /// Unregister `muxer` if it is still the one registered under its name
    pub(crate) fn detach(&self, muxer: &Arc<Muxer>) {
        let mut registry = self.write();
        if registry.state == EngineState::Shutdown {
            return;
        }
        let current = registry
            .muxers
            .get(muxer.name())
            .is_some_and(|w| w.as_ptr() == Arc::as_ptr(muxer));
        if !current {
            return;
        }
        registry.muxers.remove(muxer.name());
        self.discard(muxer);
    }

    /// Close `muxer` and delete its storage; caller holds the write lock
    fn discard(&self, muxer: &Muxer) {
        let (memory, spill) = muxer.close();
        let backlog = memory.len() + spill.as_ref().map_or(0, |s| s.len());
        if let Some(spill) = spill {
            if let Err(e) = spill.remove() {
                tracing::warn!(muxer = %muxer.name(), error = %e, "failed to remove queue file");
            }
        }
        if let Err(e) = self.inner.store.discard(muxer.name()) {
            tracing::warn!(muxer = %muxer.name(), error = %e, "failed to discard backlog");
        }
        tracing::info!(muxer = %muxer.name(), discarded = backlog, "muxer unsubscribed");
    }

    pub fn muxer_names(&self) -> Vec<String> {
        self.read()
            .muxers
            .iter()
            .filter(|(_, w)| w.strong_count() > 0)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn statistics(&self) -> EngineStats {
        let registry = self.read();
        EngineStats {
            state: registry.state,
            pending: self.inner.pending.statistics().queued_count,
            muxers: registry
                .muxers
                .iter()
                .filter_map(|(name, w)| w.upgrade().map(|m| (name.clone(), m.statistics())))
                .collect(),
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state())
            .field("queue_dir", &self.inner.config.queue_dir)
            .finish_non_exhaustive()
    }
}

/// Append `event` to every accepting muxer; returns how many enqueued it
fn fan_out(muxers: &BTreeMap<String, Weak<Muxer>>, event: &SharedEvent) -> usize {
    let targets: Vec<Arc<Muxer>> = muxers
        .values()
        .filter_map(Weak::upgrade)
        .filter(|m| m.accepts_write(event.event_type()))
        .collect();

    // All target queues stay locked until every append is done
    let mut queues: Vec<_> = targets.iter().map(|m| m.lock_queue()).collect();

    let mut delivered = 0;
    for (muxer, queue) in targets.iter().zip(queues.iter_mut()) {
        match muxer.enqueue(queue, event) {
            Ok(()) => delivered += 1,
            Err(e) => {
                tracing::warn!(
                    muxer = %muxer.name(),
                    event_type = %event.event_type(),
                    error = %e,
                    "fan-out to muxer failed"
                );
            }
        }
    }
    delivered
}

fn set_muxer_states(muxers: &BTreeMap<String, Weak<Muxer>>, state: MuxerState) {
    for muxer in muxers.values().filter_map(Weak::upgrade) {
        muxer.set_state(state);
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
