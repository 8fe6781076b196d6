// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in event categories and types

use crate::event::EventType;

/// Category identifiers (upper 16 bits of an event type)
pub mod category {
    pub const NEB: u16 = 1;
    pub const BBDO: u16 = 2;
    pub const STORAGE: u16 = 3;
    pub const EXTCMD: u16 = 7;
    pub const INTERNAL: u16 = 0xffff;
}

pub const ACKNOWLEDGEMENT: EventType = EventType::new(category::NEB, 1);
pub const HOST_CHECK: EventType = EventType::new(category::NEB, 8);
pub const HOST_STATUS: EventType = EventType::new(category::NEB, 14);
pub const LOG_ENTRY: EventType = EventType::new(category::NEB, 17);
pub const SERVICE_CHECK: EventType = EventType::new(category::NEB, 23);
pub const SERVICE_STATUS: EventType = EventType::new(category::NEB, 24);

pub const RAW: EventType = EventType::new(category::INTERNAL, 1);
pub const INSTANCE_BROADCAST: EventType = EventType::new(category::INTERNAL, 2);

pub(crate) const BUILTIN_CATEGORIES: &[(&str, u16)] = &[
    ("neb", category::NEB),
    ("bbdo", category::BBDO),
    ("storage", category::STORAGE),
    ("extcmd", category::EXTCMD),
    ("internal", category::INTERNAL),
];

pub(crate) const BUILTIN_KINDS: &[(&str, &str, EventType)] = &[
    ("neb", "acknowledgement", ACKNOWLEDGEMENT),
    ("neb", "host_check", HOST_CHECK),
    ("neb", "host_status", HOST_STATUS),
    ("neb", "log_entry", LOG_ENTRY),
    ("neb", "service_check", SERVICE_CHECK),
    ("neb", "service_status", SERVICE_STATUS),
    ("internal", "raw", RAW),
    ("internal", "instance_broadcast", INSTANCE_BROADCAST),
];
