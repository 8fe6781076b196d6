// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue file layout
//!
//! ```text
//! header:  "MBQF" | version u16 | name_len u16 | read_offset u64 | name
//! record:  payload_len u32 | crc32(payload) u32 | payload (JSON event)
//! ```
//!
//! All integers are little-endian. A record whose frame is incomplete or
//! whose checksum does not match marks the logical end of the file.

use crate::error::StorageError;
use mbus_core::Event;
use std::io::{self, Read};
use std::path::Path;

pub const MAGIC: [u8; 4] = *b"MBQF";
pub const VERSION: u16 = 1;
/// Byte position of the persisted read cursor
pub const READ_OFFSET_POS: u64 = 8;
pub const FIXED_HEADER_LEN: u64 = 16;
pub const RECORD_HEADER_LEN: u64 = 8;
pub const MAX_RECORD_LEN: u32 = 64 * 1024 * 1024;

/// Decoded file header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// Name of the queue owning the file
    pub name: String,
    pub read_offset: u64,
}

impl FileHeader {
    /// Header for an empty file; the read cursor starts at the first record
    pub fn new(name: &str) -> Result<Self, StorageError> {
        if name.len() > u16::MAX as usize {
            return Err(StorageError::NameTooLong(name.len()));
        }
        let mut header = Self {
            name: name.to_string(),
            read_offset: 0,
        };
        header.read_offset = header.data_start();
        Ok(header)
    }

    pub fn data_start(&self) -> u64 {
        FIXED_HEADER_LEN + self.name.len() as u64
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.data_start() as usize);
        buf.extend_from_slice(&MAGIC);
        buf.extend_from_slice(&VERSION.to_le_bytes());
        buf.extend_from_slice(&(self.name.len() as u16).to_le_bytes());
        buf.extend_from_slice(&self.read_offset.to_le_bytes());
        buf.extend_from_slice(self.name.as_bytes());
        buf
    }

    pub fn read_from(reader: &mut impl Read, path: &Path) -> Result<Self, StorageError> {
        let bad = |reason: &str| StorageError::BadHeader {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let mut fixed = [0u8; FIXED_HEADER_LEN as usize];
        if read_full(reader, &mut fixed)? != fixed.len() {
            return Err(bad("file shorter than header"));
        }
        if fixed[0..4] != MAGIC {
            return Err(bad("magic mismatch"));
        }
        let version = u16::from_le_bytes([fixed[4], fixed[5]]);
        if version != VERSION {
            return Err(bad(&format!("unsupported version {}", version)));
        }
        let name_len = u16::from_le_bytes([fixed[6], fixed[7]]) as usize;
        let mut offset = [0u8; 8];
        offset.copy_from_slice(&fixed[8..16]);
        let read_offset = u64::from_le_bytes(offset);

        let mut name = vec![0u8; name_len];
        if read_full(reader, &mut name)? != name_len {
            return Err(bad("truncated name"));
        }
        let name = String::from_utf8(name).map_err(|_| bad("name is not utf-8"))?;

        let header = Self { name, read_offset };
        if header.read_offset < header.data_start() {
            return Err(bad("read offset points into header"));
        }
        Ok(header)
    }
}

/// Frame one event: length, checksum, JSON payload
pub fn encode_record(event: &Event) -> Result<Vec<u8>, StorageError> {
    let payload = serde_json::to_vec(event)?;
    if payload.len() > MAX_RECORD_LEN as usize {
        return Err(StorageError::Corrupted {
            offset: 0,
            reason: format!("record of {} bytes exceeds limit", payload.len()),
        });
    }
    let mut buf = Vec::with_capacity(RECORD_HEADER_LEN as usize + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub fn decode_payload(offset: u64, payload: &[u8]) -> Result<Event, StorageError> {
    serde_json::from_slice(payload).map_err(|source| StorageError::Decode { offset, source })
}

/// Result of reading one frame
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    Record(Vec<u8>),
    /// Clean end of data
    End,
    /// Partial or corrupt frame; logical end of data
    Torn(String),
}

impl Frame {
    /// Bytes the frame occupies on disk
    pub fn encoded_len(payload: &[u8]) -> u64 {
        RECORD_HEADER_LEN + payload.len() as u64
    }
}

pub fn read_frame(reader: &mut impl Read) -> io::Result<Frame> {
    let mut head = [0u8; RECORD_HEADER_LEN as usize];
    match read_full(reader, &mut head)? {
        0 => return Ok(Frame::End),
        n if n < head.len() => return Ok(Frame::Torn("truncated record header".to_string())),
        _ => {}
    }

    let len = u32::from_le_bytes([head[0], head[1], head[2], head[3]]);
    let checksum = u32::from_le_bytes([head[4], head[5], head[6], head[7]]);
    if len > MAX_RECORD_LEN {
        return Ok(Frame::Torn(format!("record length {} exceeds limit", len)));
    }

    let mut payload = vec![0u8; len as usize];
    if read_full(reader, &mut payload)? != payload.len() {
        return Ok(Frame::Torn("truncated record payload".to_string()));
    }
    if crc32fast::hash(&payload) != checksum {
        return Ok(Frame::Torn("checksum mismatch".to_string()));
    }
    Ok(Frame::Record(payload))
}

/// Summary of the valid records after a given offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan {
    /// Offset just past the last valid record
    pub end: u64,
    pub records: usize,
    pub torn: Option<String>,
}

/// Walk frames from `start` (where `reader` is positioned) to the logical end
pub fn scan(reader: &mut impl Read, start: u64) -> io::Result<Scan> {
    let mut end = start;
    let mut records = 0;
    loop {
        match read_frame(reader)? {
            Frame::Record(payload) => {
                end += Frame::encoded_len(&payload);
                records += 1;
            }
            Frame::End => {
                return Ok(Scan {
                    end,
                    records,
                    torn: None,
                })
            }
            Frame::Torn(reason) => {
                return Ok(Scan {
                    end,
                    records,
                    torn: Some(reason),
                })
            }
        }
    }
}

/// Fill `buf` as far as the reader allows; returns bytes read
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
