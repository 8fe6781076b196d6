// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mbus-core: event model for the monitoring bus
//!
//! This crate provides:
//! - The event envelope and its built-in payload kinds
//! - The event type registry (`category:element` names to numeric types)
//! - Read/write filter sets
//! - Read deadlines
//! - TOML configuration

pub mod config;
pub mod deadline;
pub mod event;
pub mod filter;
pub mod kinds;
pub mod payload;
pub mod registry;

pub use config::{BusConfig, ConfigError, SubscriberConfig};
pub use deadline::{Deadline, Wait};
pub use event::{Event, EventType, SharedEvent};
pub use filter::{FilterError, FilterSet};
pub use payload::Payload;
pub use registry::{EventRegistry, RegistryError};
