// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only view of a queue file
//!
//! Unlike [`QueueFile`](crate::QueueFile), the reader never moves the
//! persisted read cursor. Used for inspection and validation.

use crate::error::StorageError;
use crate::record::{self, FileHeader, Frame};
use mbus_core::Event;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct QueueFileReader {
    path: PathBuf,
    header: FileHeader,
    file_len: u64,
}

impl QueueFileReader {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let header = FileHeader::read_from(&mut BufReader::new(file), path)?;
        Ok(Self {
            path: path.to_path_buf(),
            header,
            file_len,
        })
    }

    /// Unread records, in order, stopping at the logical end
    pub fn records(&self) -> Result<RecordIter, StorageError> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        reader.seek(SeekFrom::Start(self.header.read_offset))?;
        Ok(RecordIter {
            reader,
            offset: self.header.read_offset,
            done: false,
        })
    }

    pub fn validate(&self) -> Result<QueueFileValidation, StorageError> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        reader.seek(SeekFrom::Start(self.header.read_offset))?;
        let scan = record::scan(&mut reader, self.header.read_offset)?;
        Ok(QueueFileValidation {
            name: self.header.name.clone(),
            unread: scan.records,
            read_offset: self.header.read_offset,
            valid_end: scan.end,
            file_len: self.file_len,
            torn: scan.torn,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Iterator over unread records with their byte offsets
pub struct RecordIter {
    reader: BufReader<File>,
    offset: u64,
    done: bool,
}

impl Iterator for RecordIter {
    type Item = Result<(u64, Event), StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match record::read_frame(&mut self.reader) {
            Ok(Frame::Record(payload)) => {
                let offset = self.offset;
                self.offset += Frame::encoded_len(&payload);
                Some(record::decode_payload(offset, &payload).map(|e| (offset, e)))
            }
            Ok(Frame::End) | Ok(Frame::Torn(_)) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}

/// What a queue file holds past its read cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueFileValidation {
    pub name: String,
    pub unread: usize,
    pub read_offset: u64,
    /// Offset just past the last valid record
    pub valid_end: u64,
    pub file_len: u64,
    pub torn: Option<String>,
}

impl QueueFileValidation {
    /// Bytes past the last valid record
    pub fn ignored_bytes(&self) -> u64 {
        self.file_len.saturating_sub(self.valid_end)
    }

    pub fn is_clean(&self) -> bool {
        self.torn.is_none()
    }
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
