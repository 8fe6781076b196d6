// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory spill store with failure injection for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::error::StorageError;
use crate::spill::{Spill, SpillStore};
use mbus_core::{Event, SharedEvent};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct FakeState {
    queues: HashMap<String, VecDeque<Event>>,
    fail_create: bool,
    fail_writes: bool,
    fail_reads: bool,
    creates: usize,
}

/// Spill store keeping backlogs in memory
///
/// Clones share state, so a test can keep a handle and flip failures while
/// an engine uses another clone.
#[derive(Clone, Default)]
pub struct FakeSpillStore {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSpillStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make `create` fail, as when the queue directory is not writable
    pub fn fail_create(&self, fail: bool) {
        self.lock().fail_create = fail;
    }

    /// Make every append fail, as on a full disk
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Make every read fail
    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Pretend a previous run left `events` behind for `name`
    pub fn seed(&self, name: &str, events: Vec<Event>) {
        self.lock()
            .queues
            .insert(name.to_string(), events.into_iter().collect());
    }

    /// Events currently stored for `name`
    pub fn backlog(&self, name: &str) -> Vec<Event> {
        self.lock()
            .queues
            .get(name)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().queues.contains_key(name)
    }

    /// Number of successful `create` calls
    pub fn creates(&self) -> usize {
        self.lock().creates
    }
}

impl SpillStore for FakeSpillStore {
    fn open(&self, name: &str) -> Result<Option<Box<dyn Spill>>, StorageError> {
        let state = self.lock();
        match state.queues.get(name) {
            Some(q) if !q.is_empty() => Ok(Some(Box::new(FakeSpill {
                name: name.to_string(),
                state: Arc::clone(&self.state),
            }))),
            _ => Ok(None),
        }
    }

    fn create(&self, name: &str) -> Result<Box<dyn Spill>, StorageError> {
        let mut state = self.lock();
        if state.fail_create {
            return Err(injected(format!("cannot create {}", name)));
        }
        state.queues.insert(name.to_string(), VecDeque::new());
        state.creates += 1;
        Ok(Box::new(FakeSpill {
            name: name.to_string(),
            state: Arc::clone(&self.state),
        }))
    }

    fn retain(
        &self,
        name: &str,
        head: &[SharedEvent],
        tail: Option<Box<dyn Spill>>,
    ) -> Result<usize, StorageError> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(injected("disk full"));
        }

        let mut events: VecDeque<Event> = head.iter().map(|e| Event::clone(e)).collect();
        if tail.is_some() {
            if let Some(backlog) = state.queues.get(name) {
                events.extend(backlog.iter().cloned());
            }
        }

        let retained = events.len();
        state.queues.insert(name.to_string(), events);
        Ok(retained)
    }

    fn discard(&self, name: &str) -> Result<(), StorageError> {
        self.lock().queues.remove(name);
        Ok(())
    }
}

fn injected(reason: impl Into<String>) -> StorageError {
    StorageError::Io(std::io::Error::other(reason.into()))
}

struct FakeSpill {
    name: String,
    state: Arc<Mutex<FakeState>>,
}

impl FakeSpill {
    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Spill for FakeSpill {
    fn push(&mut self, event: &Event) -> Result<(), StorageError> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(injected("disk full"));
        }
        state
            .queues
            .entry(self.name.clone())
            .or_default()
            .push_back(event.clone());
        Ok(())
    }

    fn pop(&mut self) -> Result<Option<Event>, StorageError> {
        let mut state = self.lock();
        if state.fail_reads {
            return Err(injected("read error"));
        }
        Ok(state
            .queues
            .get_mut(&self.name)
            .and_then(|q| q.pop_front()))
    }

    fn len(&self) -> usize {
        self.lock().queues.get(&self.name).map_or(0, |q| q.len())
    }

    fn remove(self: Box<Self>) -> Result<(), StorageError> {
        self.lock().queues.remove(&self.name);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
