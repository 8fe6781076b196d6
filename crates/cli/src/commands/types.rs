// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! List registered event types

use crate::output::{self, OutputFormat};
use anyhow::Result;
use mbus_core::EventRegistry;
use serde::Serialize;
use std::fmt;

#[derive(clap::Args)]
pub struct TypesArgs {
    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
}

#[derive(Serialize)]
struct TypeInfo {
    name: String,
    category: u16,
    element: u16,
    value: u32,
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<28} {:>5}:{:<5} {:#010x}",
            self.name, self.category, self.element, self.value
        )
    }
}

pub fn handle(args: TypesArgs, registry: &EventRegistry) -> Result<()> {
    let types: Vec<TypeInfo> = registry
        .iter()
        .map(|(event_type, name)| TypeInfo {
            name: name.to_string(),
            category: event_type.category(),
            element: event_type.element(),
            value: event_type.value(),
        })
        .collect();
    output::print_list(&types, args.format, "no registered types");
    Ok(())
}
