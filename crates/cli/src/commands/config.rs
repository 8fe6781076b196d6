// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validate a bus configuration file

use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use mbus_core::{BusConfig, EventRegistry, FilterSet};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(clap::Args)]
pub struct ConfigArgs {
    /// Configuration file (TOML)
    file: PathBuf,

    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
}

#[derive(Serialize)]
struct SubscriberInfo {
    name: String,
    read_filter: String,
    write_filter: String,
    memory_capacity: usize,
}

impl fmt::Display for SubscriberInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<20} capacity={:<8} read={} write={}",
            self.name, self.memory_capacity, self.read_filter, self.write_filter
        )
    }
}

pub fn handle(args: ConfigArgs, registry: &EventRegistry) -> Result<()> {
    let config = BusConfig::load(&args.file)?;
    config.validate()?;

    let mut subscribers = Vec::new();
    for sub in &config.subscribers {
        let read_filter = FilterSet::parse(&sub.read_filter, registry)
            .with_context(|| format!("subscriber {}: read_filter", sub.name))?;
        let write_filter = FilterSet::parse(&sub.write_filter, registry)
            .with_context(|| format!("subscriber {}: write_filter", sub.name))?;
        subscribers.push(SubscriberInfo {
            name: sub.name.clone(),
            read_filter: read_filter.to_string(),
            write_filter: write_filter.to_string(),
            memory_capacity: sub.memory_capacity.unwrap_or(config.memory_capacity),
        });
    }

    if matches!(args.format, OutputFormat::Text) {
        println!(
            "queue_dir={} memory_capacity={} sync_writes={}",
            config.queue_dir.display(),
            config.memory_capacity,
            config.sync_writes
        );
    }
    output::print_list(&subscribers, args.format, "no subscribers");
    Ok(())
}
