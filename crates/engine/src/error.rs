// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the bus

use mbus_core::{ConfigError, FilterError, RegistryError};
use thiserror::Error;

/// Errors surfaced by the engine, muxers and stream handles
#[derive(Debug, Error)]
pub enum BusError {
    #[error("muxer already registered: {0}")]
    DuplicateName(String),
    #[error("bus is shut down")]
    Shutdown,
    #[error("persistence failure in muxer {muxer}: {reason}")]
    PersistenceFailure { muxer: String, reason: String },
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),
    #[error("invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("event registry error: {0}")]
    Registry(#[from] RegistryError),
}
