// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event envelope moved through the bus
//!
//! An [`Event`] pairs a numeric [`EventType`] with a [`Payload`]. The type is
//! the only thing the bus looks at; payloads are opaque to routing.

use crate::kinds;
use crate::payload::{
    Acknowledgement, HostCheck, HostStatus, InstanceBroadcast, LogEntry, Payload, Raw,
    ServiceCheck, ServiceStatus,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Numeric event type: `(category << 16) | element`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(u32);

impl EventType {
    pub const fn new(category: u16, element: u16) -> Self {
        Self(((category as u32) << 16) | element as u32)
    }

    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    pub const fn category(self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub const fn element(self) -> u16 {
        (self.0 & 0xffff) as u16
    }
}

impl From<u32> for EventType {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category(), self.element())
    }
}

/// An event shared between every queue that received it
pub type SharedEvent = Arc<Event>;

/// A typed unit of monitoring data
///
/// The type tag is fixed at construction; there is no setter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    event_type: EventType,
    payload: Payload,
}

impl Event {
    /// Wrap any payload under an explicit type tag
    pub fn new(event_type: EventType, payload: Payload) -> Self {
        Self {
            event_type,
            payload,
        }
    }

    /// Raw bytes under the built-in `internal:raw` type
    pub fn raw(data: impl Into<Vec<u8>>) -> Self {
        Raw::new(data).into()
    }

    /// Free-form JSON under an externally registered type
    pub fn custom(event_type: EventType, data: serde_json::Value) -> Self {
        Self::new(event_type, Payload::Custom(data))
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    pub fn into_shared(self) -> SharedEvent {
        Arc::new(self)
    }
}

macro_rules! builtin_event {
    ($payload:ident, $kind:path) => {
        impl From<$payload> for Event {
            fn from(payload: $payload) -> Self {
                Event::new($kind, Payload::$payload(payload))
            }
        }
    };
}

builtin_event!(Raw, kinds::RAW);
builtin_event!(InstanceBroadcast, kinds::INSTANCE_BROADCAST);
builtin_event!(HostStatus, kinds::HOST_STATUS);
builtin_event!(ServiceStatus, kinds::SERVICE_STATUS);
builtin_event!(HostCheck, kinds::HOST_CHECK);
builtin_event!(ServiceCheck, kinds::SERVICE_CHECK);
builtin_event!(Acknowledgement, kinds::ACKNOWLEDGEMENT);
builtin_event!(LogEntry, kinds::LOG_ENTRY);

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
