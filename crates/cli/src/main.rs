// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mbus - operator tool for monitoring bus queue files

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{config, inspect, stats, types, verify};
use mbus_core::{BusConfig, EventRegistry};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mbus", version, about = "Monitoring bus queue tools")]
struct Cli {
    /// Bus configuration file, used for defaults such as the queue directory
    #[arg(long, global = true, env = "MBUS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the unread records of a queue file
    Inspect(inspect::InspectArgs),
    /// Summarize the queue files in a directory
    Stats(stats::StatsArgs),
    /// Check a queue file for a torn tail (non-zero exit if found)
    Verify(verify::VerifyArgs),
    /// List built-in event types
    Types(types::TypesArgs),
    /// Validate a configuration file and show resolved filters
    Config(config::ConfigArgs),
}

fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();
    let registry = EventRegistry::builtin()?;

    match cli.command {
        Commands::Inspect(args) => inspect::handle(args, &registry),
        Commands::Stats(args) => {
            let bus_config = cli.config.as_deref().map(BusConfig::load).transpose()?;
            stats::handle(args, bus_config.as_ref().map(|c| c.queue_dir.as_path()))
        }
        Commands::Verify(args) => verify::handle(args),
        Commands::Types(args) => types::handle(args, &registry),
        Commands::Config(args) => config::handle(args, &registry),
    }
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
