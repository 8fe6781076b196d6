// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-consumer event queue
//!
//! A muxer keeps up to `capacity` events in memory. Once memory is full,
//! new arrivals go to a spill (a queue file in production) and memory
//! becomes a read-ahead cache of the spill's head. Every event in memory
//! precedes every event in the spill.

use crate::error::BusError;
use mbus_core::{Deadline, EventType, FilterSet, SharedEvent, Wait};
use mbus_storage::{Spill, SpillStore, StorageError};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, RwLock};
use std::time::Instant;

/// Lifecycle of a muxer, following the engine that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxerState {
    NotStarted,
    Running,
    Stopped,
    Shutdown,
}

impl fmt::Display for MuxerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MuxerState::NotStarted => "not started",
            MuxerState::Running => "running",
            MuxerState::Stopped => "stopped",
            MuxerState::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

/// Result of a blocking read
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Event(SharedEvent),
    /// The deadline passed with nothing to read
    TimedOut,
    /// The muxer was torn down
    Shutdown,
}

impl ReadOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, ReadOutcome::Event(_))
    }

    pub fn into_event(self) -> Option<SharedEvent> {
        match self {
            ReadOutcome::Event(event) => Some(event),
            _ => None,
        }
    }
}

/// Point-in-time muxer counters
///
/// Fields are read under one lock, so they are consistent with each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxerStats {
    pub state: MuxerState,
    /// Events waiting to be read (memory + file)
    pub queued_count: usize,
    pub memory_count: usize,
    pub file_count: usize,
    /// Events accepted by the write filter and enqueued
    pub written: u64,
    /// Events handed to the consumer
    pub read: u64,
    /// Events consumed without delivery because the read filter refused them
    pub skipped: u64,
    /// Events lost to persistence failures
    pub dropped: u64,
    pub degraded: bool,
}

pub(crate) struct MuxerQueue {
    memory: VecDeque<SharedEvent>,
    spill: Option<Box<dyn Spill>>,
    state: MuxerState,
    degraded: bool,
    written: u64,
    read: u64,
    skipped: u64,
    dropped: u64,
}

/// Ordered, filtered, capacity-bounded queue with durable overflow
pub struct Muxer {
    name: String,
    capacity: usize,
    store: Arc<dyn SpillStore>,
    queue: Mutex<MuxerQueue>,
    available: Condvar,
    read_filter: RwLock<FilterSet>,
    write_filter: RwLock<FilterSet>,
}

impl Muxer {
    /// Create a muxer, resuming any backlog `store` holds for `name`
    ///
    /// A backlog that cannot be opened leaves the muxer degraded rather than
    /// failing; the file is left untouched for inspection.
    pub(crate) fn new(
        name: &str,
        capacity: usize,
        read_filter: FilterSet,
        write_filter: FilterSet,
        store: Arc<dyn SpillStore>,
        state: MuxerState,
    ) -> Self {
        let (spill, degraded) = match store.open(name) {
            Ok(spill) => (spill, false),
            Err(e) => {
                tracing::error!(muxer = name, error = %e, "cannot resume queue file; muxer degraded");
                (None, true)
            }
        };

        Self {
            name: name.to_string(),
            capacity,
            store,
            queue: Mutex::new(MuxerQueue {
                memory: VecDeque::new(),
                spill,
                state,
                degraded,
                written: 0,
                read: 0,
                skipped: 0,
                dropped: 0,
            }),
            available: Condvar::new(),
            read_filter: RwLock::new(read_filter),
            write_filter: RwLock::new(write_filter),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn lock_queue(&self) -> MutexGuard<'_, MuxerQueue> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn read_filter(&self) -> FilterSet {
        self.read_filter
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn write_filter(&self) -> FilterSet {
        self.write_filter
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the read filter; events already queued are filtered on pop
    pub fn set_read_filter(&self, filter: FilterSet) {
        tracing::debug!(muxer = %self.name, filter = %filter, "read filter updated");
        *self.read_filter.write().unwrap_or_else(|e| e.into_inner()) = filter;
    }

    /// Replace the write filter; events already queued stay queued
    pub fn set_write_filter(&self, filter: FilterSet) {
        tracing::debug!(muxer = %self.name, filter = %filter, "write filter updated");
        *self.write_filter.write().unwrap_or_else(|e| e.into_inner()) = filter;
    }

    pub(crate) fn accepts_write(&self, event_type: EventType) -> bool {
        self.write_filter
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .accepts(event_type)
    }

    fn accepts_read(&self, event_type: EventType) -> bool {
        self.read_filter
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .accepts(event_type)
    }

    /// Append `event` if the write filter accepts it
    ///
    /// Returns `Ok(false)` when the filter rejects the event.
    pub fn write(&self, event: &SharedEvent) -> Result<bool, BusError> {
        if !self.accepts_write(event.event_type()) {
            tracing::debug!(
                muxer = %self.name,
                event_type = %event.event_type(),
                "write filter rejected event"
            );
            return Ok(false);
        }
        let mut queue = self.lock_queue();
        self.enqueue(&mut queue, event)?;
        Ok(true)
    }

    /// Append `event` to a queue the caller has locked
    pub(crate) fn enqueue(
        &self,
        queue: &mut MuxerQueue,
        event: &SharedEvent,
    ) -> Result<(), BusError> {
        if queue.state == MuxerState::Shutdown {
            return Err(BusError::Shutdown);
        }

        let overflow = queue.spill.is_some() || queue.memory.len() >= self.capacity;
        if !overflow {
            queue.memory.push_back(Arc::clone(event));
            queue.written += 1;
            self.available.notify_all();
            return Ok(());
        }

        if queue.degraded {
            queue.dropped += 1;
            tracing::warn!(
                muxer = %self.name,
                event_type = %event.event_type(),
                dropped = queue.dropped,
                "muxer degraded; overflow event dropped"
            );
            return Err(BusError::PersistenceFailure {
                muxer: self.name.clone(),
                reason: "overflow storage unavailable".to_string(),
            });
        }

        if queue.spill.is_none() {
            match self.store.create(&self.name) {
                Ok(spill) => {
                    tracing::info!(
                        muxer = %self.name,
                        capacity = self.capacity,
                        "memory full; spilling to queue file"
                    );
                    queue.spill = Some(spill);
                }
                Err(e) => return Err(self.degrade(queue, e)),
            }
        }

        let pushed = match queue.spill.as_mut() {
            Some(spill) => spill.push(event),
            None => Ok(()),
        };
        if let Err(e) = pushed {
            self.release_empty_spill(queue);
            return Err(self.degrade(queue, e));
        }

        queue.written += 1;
        self.available.notify_all();
        Ok(())
    }

    fn degrade(&self, queue: &mut MuxerQueue, error: StorageError) -> BusError {
        queue.degraded = true;
        queue.dropped += 1;
        tracing::error!(
            muxer = %self.name,
            error = %error,
            "queue file write failed; muxer degraded"
        );
        BusError::PersistenceFailure {
            muxer: self.name.clone(),
            reason: error.to_string(),
        }
    }

    /// Pop the next event the read filter accepts
    ///
    /// Events the read filter refuses are consumed and discarded. Waits up
    /// to `deadline` while the queue is empty.
    pub fn read(&self, deadline: Deadline) -> ReadOutcome {
        let mut queue = self.lock_queue();
        loop {
            if queue.state == MuxerState::Shutdown {
                return ReadOutcome::Shutdown;
            }

            while let Some(event) = self.pop_front(&mut queue) {
                if self.accepts_read(event.event_type()) {
                    queue.read += 1;
                    return ReadOutcome::Event(event);
                }
                queue.skipped += 1;
                tracing::debug!(
                    muxer = %self.name,
                    event_type = %event.event_type(),
                    "read filter skipped event"
                );
            }

            queue = match deadline.remaining(Instant::now()) {
                Wait::Expired => return ReadOutcome::TimedOut,
                Wait::For(timeout) => {
                    self.available
                        .wait_timeout(queue, timeout)
                        .unwrap_or_else(|e| e.into_inner())
                        .0
                }
                Wait::Forever => self
                    .available
                    .wait(queue)
                    .unwrap_or_else(|e| e.into_inner()),
            };
        }
    }

    fn pop_front(&self, queue: &mut MuxerQueue) -> Option<SharedEvent> {
        if queue.memory.is_empty() {
            self.refill(queue);
        }
        queue.memory.pop_front()
    }

    /// Move events from the spill head into memory
    fn refill(&self, queue: &mut MuxerQueue) {
        let Some(spill) = queue.spill.as_mut() else {
            return;
        };

        let mut abandoned = false;
        while queue.memory.len() < self.capacity {
            match spill.pop() {
                Ok(Some(event)) => queue.memory.push_back(event.into_shared()),
                Ok(None) => break,
                Err(e) if e.is_record_local() => {
                    queue.dropped += 1;
                    tracing::warn!(muxer = %self.name, error = %e, "skipping unreadable record");
                }
                Err(e) => {
                    let lost = spill.len() as u64;
                    queue.dropped += lost;
                    queue.degraded = true;
                    tracing::error!(
                        muxer = %self.name,
                        error = %e,
                        lost,
                        "queue file unreadable; backlog abandoned, muxer degraded"
                    );
                    abandoned = true;
                    break;
                }
            }
        }

        if abandoned {
            if let Some(spill) = queue.spill.take() {
                if let Err(e) = spill.remove() {
                    tracing::warn!(muxer = %self.name, error = %e, "failed to remove queue file");
                }
            }
        } else {
            self.release_empty_spill(queue);
        }
    }

    /// Delete the spill once it is drained; the next overflow recreates it
    fn release_empty_spill(&self, queue: &mut MuxerQueue) {
        if !queue.spill.as_ref().is_some_and(|s| s.is_empty()) {
            return;
        }
        if let Some(spill) = queue.spill.take() {
            tracing::debug!(muxer = %self.name, "queue file drained");
            if let Err(e) = spill.remove() {
                tracing::warn!(muxer = %self.name, error = %e, "failed to remove queue file");
            }
        }
    }

    pub fn statistics(&self) -> MuxerStats {
        let queue = self.lock_queue();
        let file_count = queue.spill.as_ref().map_or(0, |s| s.len());
        MuxerStats {
            state: queue.state,
            queued_count: queue.memory.len() + file_count,
            memory_count: queue.memory.len(),
            file_count,
            written: queue.written,
            read: queue.read,
            skipped: queue.skipped,
            dropped: queue.dropped,
            degraded: queue.degraded,
        }
    }

    pub fn state(&self) -> MuxerState {
        self.lock_queue().state
    }

    pub fn is_degraded(&self) -> bool {
        self.lock_queue().degraded
    }

    pub(crate) fn set_state(&self, state: MuxerState) {
        let mut queue = self.lock_queue();
        if queue.state != MuxerState::Shutdown {
            queue.state = state;
        }
    }

    /// Tear down: wake waiting readers and hand back whatever is queued
    pub(crate) fn close(&self) -> (Vec<SharedEvent>, Option<Box<dyn Spill>>) {
        let mut queue = self.lock_queue();
        queue.state = MuxerState::Shutdown;
        self.available.notify_all();
        let memory = queue.memory.drain(..).collect();
        (memory, queue.spill.take())
    }
}

impl fmt::Debug for Muxer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Muxer")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "muxer_tests.rs"]
mod tests;
