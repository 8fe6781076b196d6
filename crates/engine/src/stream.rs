// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Common interface of bus endpoints
//!
//! Stream adapters (network writers, database connectors) drive either end of
//! the bus through this trait. A publisher only writes and a subscriber only
//! reads; the other direction fails with `UnsupportedOperation`.

use crate::error::BusError;
use crate::muxer::ReadOutcome;
use mbus_core::{Deadline, Event};

pub trait Stream {
    /// Next event, waiting up to `deadline`
    fn read(&self, deadline: Deadline) -> Result<ReadOutcome, BusError>;

    /// Hand `event` to the bus; returns how many consumers received it
    fn write(&self, event: Event) -> Result<usize, BusError>;
}
