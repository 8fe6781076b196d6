// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage errors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bad queue file header in {path}: {reason}")]
    BadHeader { path: PathBuf, reason: String },
    #[error("undecodable record at offset {offset}: {source}")]
    Decode {
        offset: u64,
        #[source]
        source: serde_json::Error,
    },
    #[error("corrupted record at offset {offset}: {reason}")]
    Corrupted { offset: u64, reason: String },
    #[error("queue name too long: {0} bytes")]
    NameTooLong(usize),
}

impl StorageError {
    /// Errors that only affect one record; the rest of the file stays readable
    pub fn is_record_local(&self) -> bool {
        matches!(self, StorageError::Decode { .. })
    }
}
