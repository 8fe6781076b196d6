// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus configuration
//!
//! Loaded from TOML. Durations use humantime syntax ("500ms", "2s").

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("memory capacity must be positive ({0})")]
    ZeroCapacity(String),
    #[error("subscriber name must not be empty")]
    EmptyName,
    #[error("duplicate subscriber: {0}")]
    DuplicateSubscriber(String),
}

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    /// Directory holding one queue file per overflowing muxer
    #[serde(default = "default_queue_dir")]
    pub queue_dir: PathBuf,
    /// Events a muxer keeps in memory before spilling to disk
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,
    /// fsync every queue file append
    #[serde(default)]
    pub sync_writes: bool,
    /// Default wait used by `Subscriber::next`
    #[serde(default = "default_read_timeout", with = "humantime_serde")]
    pub read_timeout: Duration,
    #[serde(default, rename = "subscriber")]
    pub subscribers: Vec<SubscriberConfig>,
}

/// A consumer declared in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscriberConfig {
    pub name: String,
    #[serde(default = "default_filter")]
    pub read_filter: String,
    #[serde(default = "default_filter")]
    pub write_filter: String,
    /// Overrides `BusConfig::memory_capacity`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_capacity: Option<usize>,
}

fn default_queue_dir() -> PathBuf {
    PathBuf::from("queues")
}

fn default_memory_capacity() -> usize {
    10_000
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_filter() -> String {
    "all".to_string()
}

impl BusConfig {
    pub fn new(queue_dir: impl Into<PathBuf>) -> Self {
        Self {
            queue_dir: queue_dir.into(),
            memory_capacity: default_memory_capacity(),
            sync_writes: false,
            read_timeout: default_read_timeout(),
            subscribers: Vec::new(),
        }
    }

    pub fn with_memory_capacity(self, memory_capacity: usize) -> Self {
        Self {
            memory_capacity,
            ..self
        }
    }

    pub fn with_sync_writes(self, sync_writes: bool) -> Self {
        Self {
            sync_writes,
            ..self
        }
    }

    pub fn with_read_timeout(self, read_timeout: Duration) -> Self {
        Self {
            read_timeout,
            ..self
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: BusConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(
            path = %path.display(),
            subscribers = config.subscribers.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("memory_capacity".to_string()));
        }

        let mut seen = HashSet::new();
        for sub in &self.subscribers {
            if sub.name.trim().is_empty() {
                return Err(ConfigError::EmptyName);
            }
            if sub.memory_capacity == Some(0) {
                return Err(ConfigError::ZeroCapacity(sub.name.clone()));
            }
            if !seen.insert(sub.name.as_str()) {
                return Err(ConfigError::DuplicateSubscriber(sub.name.clone()));
            }
        }
        Ok(())
    }

    pub fn subscriber(&self, name: &str) -> Option<&SubscriberConfig> {
        self.subscribers.iter().find(|s| s.name == name)
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::new(default_queue_dir())
    }
}

impl SubscriberConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            read_filter: default_filter(),
            write_filter: default_filter(),
            memory_capacity: None,
        }
    }

    pub fn with_filters(self, read_filter: &str, write_filter: &str) -> Self {
        Self {
            read_filter: read_filter.to_string(),
            write_filter: write_filter.to_string(),
            ..self
        }
    }

    pub fn with_memory_capacity(self, memory_capacity: usize) -> Self {
        Self {
            memory_capacity: Some(memory_capacity),
            ..self
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
