// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! mbus-storage: on-disk overflow for bus queues
//!
//! Queue files are append-only with a persisted read cursor and a CRC per
//! record. A torn trailing record (crash mid-append) is detected and ignored.

mod error;
#[cfg(any(test, feature = "test-support"))]
mod fake;
mod queue_file;
mod reader;
pub mod record;
mod spill;

pub use error::StorageError;
pub use queue_file::QueueFile;
pub use reader::{QueueFileReader, QueueFileValidation, RecordIter};
pub use spill::{QueueDir, Spill, SpillStore, QUEUE_FILE_EXT};

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSpillStore;
