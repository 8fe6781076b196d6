// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod config;
pub mod inspect;
pub mod stats;
pub mod types;
pub mod verify;

use mbus_core::{EventRegistry, EventType};

/// Registered name of `event_type`, or its numeric `category:element` form
fn type_label(registry: &EventRegistry, event_type: EventType) -> String {
    registry
        .name_of(event_type)
        .map_or_else(|| event_type.to_string(), str::to_string)
}
