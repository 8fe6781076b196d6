// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Print the unread records of a queue file

use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use mbus_core::EventRegistry;
use mbus_storage::QueueFileReader;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(clap::Args)]
pub struct InspectArgs {
    /// Queue file to read
    file: PathBuf,

    /// Stop after this many records
    #[arg(long)]
    limit: Option<usize>,

    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
}

#[derive(Serialize)]
struct RecordInfo {
    offset: u64,
    event_type: u32,
    name: String,
    payload: serde_json::Value,
}

impl fmt::Display for RecordInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>10}  {:<28} {}", self.offset, self.name, self.payload)
    }
}

pub fn handle(args: InspectArgs, registry: &EventRegistry) -> Result<()> {
    let reader = QueueFileReader::open(&args.file)
        .with_context(|| format!("cannot open {}", args.file.display()))?;

    let mut records = Vec::new();
    for record in reader.records()?.take(args.limit.unwrap_or(usize::MAX)) {
        let (offset, event) = record?;
        records.push(RecordInfo {
            offset,
            event_type: event.event_type().value(),
            name: super::type_label(registry, event.event_type()),
            payload: serde_json::to_value(event.payload())?,
        });
    }

    if matches!(args.format, OutputFormat::Text) {
        println!("queue: {}", reader.header().name);
    }
    output::print_list(&records, args.format, "no unread records");
    Ok(())
}
