//! Configuration management for fast_file_search
//!
//! Supports loading configuration from TOML files with environment overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine configuration.
///
/// Every field has a sensible default so an empty TOML file (or no file at
/// all) yields a working engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of threads in the session worker pool.
    /// One session occupies at most one worker at a time.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the pollable delivery queue per session.
    /// A session worker blocks once the queue is full until the caller polls.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Result cap applied when the caller passes `max_results = 0`.
    #[serde(default = "default_max_results")]
    pub default_max_results: u32,

    /// Hard upper bound on any caller-supplied result cap.
    #[serde(default = "default_max_results_cap")]
    pub max_results_cap: u32,
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_max_results() -> u32 {
    1000
}

fn default_max_results_cap() -> u32 {
    100_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            default_max_results: default_max_results(),
            max_results_cap: default_max_results_cap(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    /// Env vars take precedence over TOML config values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("FFS_WORKERS") {
            if let Ok(n) = val.parse::<usize>() {
                if n > 0 {
                    self.workers = n;
                }
            }
        }
        if let Ok(val) = std::env::var("FFS_QUEUE_CAPACITY") {
            if let Ok(n) = val.parse::<usize>() {
                if n > 0 {
                    self.queue_capacity = n;
                }
            }
        }
        if let Ok(val) = std::env::var("FFS_MAX_RESULTS") {
            if let Ok(n) = val.parse::<u32>() {
                if n > 0 {
                    self.default_max_results = n;
                }
            }
        }
        self
    }

    /// Resolve a caller-supplied result cap against the configured bounds.
    /// Zero selects the default; anything else is clamped to the hard cap.
    pub fn effective_max_results(&self, requested: u32) -> u32 {
        if requested == 0 {
            self.default_max_results
        } else {
            requested.min(self.max_results_cap)
        }
    }
}
