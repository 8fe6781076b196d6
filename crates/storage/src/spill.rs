// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Overflow storage for in-memory queues
//!
//! A queue that outgrows its memory budget spills new arrivals into a
//! [`Spill`] obtained from a [`SpillStore`]. [`QueueDir`] is the file-backed
//! store: one [`QueueFile`] per queue name inside a directory.

use crate::error::StorageError;
use crate::queue_file::QueueFile;
use crate::reader::QueueFileReader;
use mbus_core::{Event, SharedEvent};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File extension of queue files
pub const QUEUE_FILE_EXT: &str = "mq";

/// FIFO overflow owned by one queue
pub trait Spill: Send {
    fn push(&mut self, event: &Event) -> Result<(), StorageError>;

    fn pop(&mut self) -> Result<Option<Event>, StorageError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete the backing storage
    fn remove(self: Box<Self>) -> Result<(), StorageError>;
}

/// Factory for per-queue overflow storage
pub trait SpillStore: Send + Sync {
    /// Backlog left for `name` by a previous run, if any
    fn open(&self, name: &str) -> Result<Option<Box<dyn Spill>>, StorageError>;

    /// Empty overflow for `name`, replacing whatever was there
    fn create(&self, name: &str) -> Result<Box<dyn Spill>, StorageError>;

    /// Persist `head` followed by the rest of `tail` as the backlog of `name`
    ///
    /// Returns the number of events left in storage. On failure the backlog
    /// previously stored for `name` is left as it was; only `head` is lost.
    fn retain(
        &self,
        name: &str,
        head: &[SharedEvent],
        tail: Option<Box<dyn Spill>>,
    ) -> Result<usize, StorageError>;

    /// Delete any backlog stored for `name`
    fn discard(&self, name: &str) -> Result<(), StorageError>;
}

impl Spill for QueueFile {
    fn push(&mut self, event: &Event) -> Result<(), StorageError> {
        self.append(event)
    }

    fn pop(&mut self) -> Result<Option<Event>, StorageError> {
        QueueFile::pop(self)
    }

    fn len(&self) -> usize {
        QueueFile::len(self)
    }

    fn remove(self: Box<Self>) -> Result<(), StorageError> {
        QueueFile::remove(*self)
    }
}

/// Directory of queue files, one per queue name
///
/// Nothing touches the disk until a queue actually spills.
#[derive(Debug, Clone)]
pub struct QueueDir {
    dir: PathBuf,
    sync_writes: bool,
}

impl QueueDir {
    pub fn new(dir: impl Into<PathBuf>, sync_writes: bool) -> Self {
        Self {
            dir: dir.into(),
            sync_writes,
        }
    }

    /// Write `head` then the unread records of `tail` into a fresh file
    fn stage(
        &self,
        name: &str,
        head: &[SharedEvent],
        tail: Option<&Path>,
        staging: &Path,
    ) -> Result<usize, StorageError> {
        let mut file = QueueFile::create(staging, name, self.sync_writes)?;
        for event in head {
            file.append(event)?;
        }
        if let Some(tail) = tail {
            for record in QueueFileReader::open(tail)?.records()? {
                match record {
                    Ok((_, event)) => file.append(&event)?,
                    Err(e) if e.is_record_local() => {
                        tracing::warn!(queue = name, error = %e, "skipping unreadable record");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(file.len())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic file path for a queue name
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(file_name(name))
    }

    /// Queue files currently present, sorted by path
    pub fn list(&self) -> Result<Vec<PathBuf>, StorageError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == QUEUE_FILE_EXT) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl SpillStore for QueueDir {
    fn open(&self, name: &str) -> Result<Option<Box<dyn Spill>>, StorageError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }

        let file = QueueFile::open(&path, self.sync_writes)?;
        if file.is_empty() {
            file.remove()?;
            return Ok(None);
        }

        tracing::info!(
            queue = name,
            path = %path.display(),
            backlog = file.len(),
            "resuming queue file"
        );
        Ok(Some(Box::new(file)))
    }

    fn create(&self, name: &str) -> Result<Box<dyn Spill>, StorageError> {
        let file = QueueFile::create(&self.path_for(name), name, self.sync_writes)?;
        Ok(Box::new(file))
    }

    fn retain(
        &self,
        name: &str,
        head: &[SharedEvent],
        tail: Option<Box<dyn Spill>>,
    ) -> Result<usize, StorageError> {
        if head.is_empty() {
            return Ok(tail.map_or(0, |t| t.len()));
        }

        let path = self.path_for(name);
        let staging = path.with_extension(format!("{}.tmp", QUEUE_FILE_EXT));

        // Closing the tail keeps its records and read cursor on disk; they
        // are copied without being consumed
        let tail_path = tail.map(|_| path.as_path());
        let staged = self
            .stage(name, head, tail_path, &staging)
            .and_then(|retained| {
                fs::rename(&staging, &path)?;
                Ok(retained)
            });
        if staged.is_err() {
            match fs::remove_file(&staging) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %staging.display(), error = %e, "failed to remove staging file");
                }
            }
        }
        staged
    }

    fn discard(&self, name: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// `<sanitized name>-<crc32 of name>.mq`
///
/// The checksum keeps names that sanitize to the same text apart.
fn file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .take(64)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "{}-{:08x}.{}",
        sanitized,
        crc32fast::hash(name.as_bytes()),
        QUEUE_FILE_EXT
    )
}

#[cfg(test)]
#[path = "spill_tests.rs"]
mod tests;
