// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Producer handle

use crate::engine::Engine;
use crate::error::BusError;
use crate::muxer::ReadOutcome;
use crate::stream::Stream;
use mbus_core::{Deadline, Event};

/// Write-only endpoint; any number may exist at once
#[derive(Debug, Clone)]
pub struct Publisher {
    engine: Engine,
}

impl Publisher {
    pub fn new(engine: &Engine) -> Self {
        Self {
            engine: engine.clone(),
        }
    }

    /// Publish `event`; returns the number of muxers it reached
    ///
    /// Zero is not an error: nobody may be listening, or the engine is
    /// stopped and the event is held until start.
    pub fn write(&self, event: Event) -> Result<usize, BusError> {
        self.engine.publish(event)
    }
}

impl Stream for Publisher {
    fn read(&self, _deadline: Deadline) -> Result<ReadOutcome, BusError> {
        Err(BusError::UnsupportedOperation("cannot read from a publisher"))
    }

    fn write(&self, event: Event) -> Result<usize, BusError> {
        Publisher::write(self, event)
    }
}
