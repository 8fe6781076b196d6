// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Check a queue file for a torn or corrupt tail

use anyhow::{bail, Context, Result};
use mbus_storage::QueueFileReader;
use std::path::PathBuf;

#[derive(clap::Args)]
pub struct VerifyArgs {
    /// Queue file to check
    file: PathBuf,
}

pub fn handle(args: VerifyArgs) -> Result<()> {
    let validation = QueueFileReader::open(&args.file)
        .and_then(|reader| reader.validate())
        .with_context(|| format!("cannot read {}", args.file.display()))?;

    println!(
        "{}: queue {}, {} unread record(s), read offset {}",
        args.file.display(),
        validation.name,
        validation.unread,
        validation.read_offset
    );

    if let Some(reason) = &validation.torn {
        bail!(
            "torn tail at offset {} ({} byte(s) ignored): {}",
            validation.valid_end,
            validation.ignored_bytes(),
            reason
        );
    }
    println!("ok");
    Ok(())
}
