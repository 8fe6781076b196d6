// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mbus-engine: in-process event multiplexing
//!
//! Publishers write events into an [`Engine`], which fans each one out to
//! the [`Muxer`] of every [`Subscriber`] whose write filter accepts it.
//! Each muxer is an independent FIFO that spills to disk when its memory
//! budget is exhausted.

mod engine;
mod error;
mod muxer;
mod publisher;
mod stream;
mod subscriber;

pub use engine::{Engine, EngineState, EngineStats, PENDING_QUEUE};
pub use error::BusError;
pub use muxer::{Muxer, MuxerState, MuxerStats, ReadOutcome};
pub use publisher::Publisher;
pub use stream::Stream;
pub use subscriber::Subscriber;
