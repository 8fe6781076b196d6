// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read deadlines

use std::time::{Duration, Instant};

/// How long a blocking read may wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Do not wait at all
    Immediate,
    /// Wait until this instant
    At(Instant),
    /// Wait until data arrives or the queue shuts down
    Infinite,
}

/// Remaining wait budget at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    Expired,
    For(Duration),
    Forever,
}

impl Deadline {
    /// Deadline `timeout` from now; overflow saturates to `Infinite`
    pub fn after(timeout: Duration) -> Self {
        if timeout.is_zero() {
            return Deadline::Immediate;
        }
        Instant::now()
            .checked_add(timeout)
            .map_or(Deadline::Infinite, Deadline::At)
    }

    pub fn remaining(&self, now: Instant) -> Wait {
        match self {
            Deadline::Immediate => Wait::Expired,
            Deadline::Infinite => Wait::Forever,
            Deadline::At(at) if *at <= now => Wait::Expired,
            Deadline::At(at) => Wait::For(*at - now),
        }
    }
}

impl From<Duration> for Deadline {
    fn from(timeout: Duration) -> Self {
        Deadline::after(timeout)
    }
}
