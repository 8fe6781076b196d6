// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Summarize every queue file in a directory

use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use mbus_storage::{QueueDir, QueueFileReader};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(clap::Args)]
pub struct StatsArgs {
    /// Queue directory (defaults to `queue_dir` from --config)
    dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
}

#[derive(Serialize)]
struct QueueFileStats {
    file: String,
    name: Option<String>,
    unread: usize,
    bytes: u64,
    torn: bool,
    error: Option<String>,
}

impl fmt::Display for QueueFileStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.error {
            return write!(f, "{:<40} unreadable: {}", self.file, error);
        }
        write!(
            f,
            "{:<40} {:<20} unread={:<8} bytes={:<10}{}",
            self.file,
            self.name.as_deref().unwrap_or("-"),
            self.unread,
            self.bytes,
            if self.torn { " torn" } else { "" }
        )
    }
}

pub fn handle(args: StatsArgs, default_dir: Option<&Path>) -> Result<()> {
    let dir = args
        .dir
        .or_else(|| default_dir.map(Path::to_path_buf))
        .context("no queue directory given and no --config to take it from")?;

    let store = QueueDir::new(&dir, false);
    let stats: Vec<QueueFileStats> = store
        .list()
        .with_context(|| format!("cannot list {}", dir.display()))?
        .iter()
        .map(|path| file_stats(path))
        .collect();

    output::print_list(&stats, args.format, "no queue files");
    Ok(())
}

fn file_stats(path: &Path) -> QueueFileStats {
    let file = path
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    let validation = QueueFileReader::open(path).and_then(|reader| reader.validate());
    match validation {
        Ok(v) => QueueFileStats {
            file,
            name: Some(v.name.clone()),
            unread: v.unread,
            bytes: v.file_len,
            torn: !v.is_clean(),
            error: None,
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable queue file");
            QueueFileStats {
                file,
                name: None,
                unread: 0,
                bytes: 0,
                torn: false,
                error: Some(e.to_string()),
            }
        }
    }
}
