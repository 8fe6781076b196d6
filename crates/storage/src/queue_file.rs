// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only queue file
//!
//! A queue file holds the overflow of one queue in FIFO order. Records are
//! appended at the write cursor and consumed at the read cursor; the read
//! cursor is persisted in the header so a reopened file resumes where the
//! previous reader stopped.

use crate::error::StorageError;
use crate::record::{self, FileHeader, Frame, READ_OFFSET_POS};
use mbus_core::Event;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Durable FIFO of events backed by one file
#[derive(Debug)]
pub struct QueueFile {
    path: PathBuf,
    file: File,
    header: FileHeader,
    write_offset: u64,
    pending: usize,
    sync_writes: bool,
    torn: Option<String>,
}

impl QueueFile {
    /// Create an empty queue file, replacing any existing file at `path`
    pub fn create(path: &Path, name: &str, sync_writes: bool) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let header = FileHeader::new(name)?;
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.write_all(&header.encode())?;
        if sync_writes {
            file.sync_all()?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            write_offset: header.data_start(),
            header,
            pending: 0,
            sync_writes,
            torn: None,
        })
    }

    /// Open an existing queue file
    ///
    /// Scans from the persisted read cursor to find the write cursor. A torn
    /// trailing record ends the scan; the bytes after it are ignored and
    /// overwritten by the next append.
    pub fn open(path: &Path, sync_writes: bool) -> Result<Self, StorageError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let file_len = file.metadata()?.len();

        let mut reader = BufReader::new(&file);
        let header = FileHeader::read_from(&mut reader, path)?;
        if header.read_offset > file_len {
            return Err(StorageError::BadHeader {
                path: path.to_path_buf(),
                reason: format!(
                    "read offset {} beyond end of file ({})",
                    header.read_offset, file_len
                ),
            });
        }

        reader.seek(SeekFrom::Start(header.read_offset))?;
        let scan = record::scan(&mut reader, header.read_offset)?;
        drop(reader);

        if let Some(reason) = &scan.torn {
            tracing::warn!(
                path = %path.display(),
                offset = scan.end,
                ignored_bytes = file_len - scan.end,
                reason = %reason,
                "queue file has a torn tail"
            );
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            header,
            write_offset: scan.end,
            pending: scan.records,
            sync_writes,
            torn: scan.torn,
        })
    }

    /// Append one event at the write cursor
    pub fn append(&mut self, event: &Event) -> Result<(), StorageError> {
        let frame = record::encode_record(event)?;

        self.file.seek(SeekFrom::Start(self.write_offset))?;
        self.file.write_all(&frame)?;
        if self.sync_writes {
            self.file.sync_data()?;
        }

        self.write_offset += frame.len() as u64;
        self.pending += 1;
        Ok(())
    }

    /// Consume the record at the read cursor
    ///
    /// The cursor advances even when the payload cannot be decoded, so one
    /// bad record never blocks the rest of the file.
    pub fn pop(&mut self) -> Result<Option<Event>, StorageError> {
        if self.pending == 0 {
            return Ok(None);
        }

        let offset = self.header.read_offset;
        self.file.seek(SeekFrom::Start(offset))?;
        let frame = record::read_frame(&mut &self.file)?;

        match frame {
            Frame::Record(payload) => {
                self.commit_read(offset + Frame::encoded_len(&payload))?;
                self.pending -= 1;
                record::decode_payload(offset, &payload).map(Some)
            }
            Frame::End => Err(self.lose_tail(offset, "unexpected end of file".to_string())),
            Frame::Torn(reason) => Err(self.lose_tail(offset, reason)),
        }
    }

    /// The file changed under us; everything from `offset` on is unreadable
    fn lose_tail(&mut self, offset: u64, reason: String) -> StorageError {
        self.pending = 0;
        self.write_offset = offset;
        StorageError::Corrupted { offset, reason }
    }

    fn commit_read(&mut self, next: u64) -> Result<(), StorageError> {
        self.file.seek(SeekFrom::Start(READ_OFFSET_POS))?;
        self.file.write_all(&next.to_le_bytes())?;
        if self.sync_writes {
            self.file.sync_data()?;
        }
        self.header.read_offset = next;
        Ok(())
    }

    /// Delete the file
    pub fn remove(self) -> Result<(), StorageError> {
        let path = self.path.clone();
        drop(self);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Unread records
    pub fn len(&self) -> usize {
        self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending == 0
    }

    /// Read cursor has caught up with the write cursor
    pub fn is_drained(&self) -> bool {
        self.header.read_offset >= self.write_offset
    }

    pub fn read_offset(&self) -> u64 {
        self.header.read_offset
    }

    pub fn write_offset(&self) -> u64 {
        self.write_offset
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Why the tail was ignored at open, if it was
    pub fn torn_tail(&self) -> Option<&str> {
        self.torn.as_deref()
    }
}

#[cfg(test)]
#[path = "queue_file_tests.rs"]
mod tests;
