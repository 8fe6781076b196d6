// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Payloads carried by events
//!
//! The built-in kinds mirror what pollers emit (status, checks,
//! acknowledgements, log lines) plus two internal kinds used by the broker
//! itself. Anything else travels as [`Payload::Custom`] JSON.

use crate::event::EventType;
use crate::kinds;
use serde::{Deserialize, Serialize};

/// Event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    Raw(Raw),
    InstanceBroadcast(InstanceBroadcast),
    HostStatus(HostStatus),
    ServiceStatus(ServiceStatus),
    HostCheck(HostCheck),
    ServiceCheck(ServiceCheck),
    Acknowledgement(Acknowledgement),
    LogEntry(LogEntry),
    Custom(serde_json::Value),
}

impl Payload {
    /// Type a built-in payload is registered under, `None` for custom data
    pub fn builtin_type(&self) -> Option<EventType> {
        match self {
            Payload::Raw(_) => Some(kinds::RAW),
            Payload::InstanceBroadcast(_) => Some(kinds::INSTANCE_BROADCAST),
            Payload::HostStatus(_) => Some(kinds::HOST_STATUS),
            Payload::ServiceStatus(_) => Some(kinds::SERVICE_STATUS),
            Payload::HostCheck(_) => Some(kinds::HOST_CHECK),
            Payload::ServiceCheck(_) => Some(kinds::SERVICE_CHECK),
            Payload::Acknowledgement(_) => Some(kinds::ACKNOWLEDGEMENT),
            Payload::LogEntry(_) => Some(kinds::LOG_ENTRY),
            Payload::Custom(_) => None,
        }
    }
}

/// Opaque bytes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Raw {
    pub data: Vec<u8>,
}

impl Raw {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }
}

/// Identity announcement of a broker instance and its poller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceBroadcast {
    pub broker_id: u32,
    pub broker_name: String,
    pub enabled: bool,
    pub poller_id: u32,
    pub poller_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostStatus {
    pub host_id: u64,
    /// 0 up, 1 down, 2 unreachable
    pub state: u16,
    pub output: String,
    /// Unix seconds
    pub last_check: i64,
    pub acknowledged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub host_id: u64,
    pub service_id: u64,
    /// 0 ok, 1 warning, 2 critical, 3 unknown
    pub state: u16,
    pub output: String,
    pub last_check: i64,
    pub acknowledged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCheck {
    pub host_id: u64,
    pub command_line: String,
    pub active: bool,
    pub next_check: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCheck {
    pub host_id: u64,
    pub service_id: u64,
    pub command_line: String,
    pub active: bool,
    pub next_check: i64,
}

/// Acknowledgement of a host (no `service_id`) or service problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub host_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<u64>,
    pub author: String,
    pub comment: String,
    pub entry_time: i64,
    pub sticky: bool,
    pub notify_contacts: bool,
    pub persistent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub ctime: i64,
    pub host_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_description: Option<String>,
    pub output: String,
}
