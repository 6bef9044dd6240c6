//! Configuration file (`config.toml`)
//!
//! ```toml
//! [import]
//! batch_size = 500
//! nested_compositions = false
//!
//! [http]
//! timeout_secs = 60
//! max_attempts = 3
//!
//! [profiles.staging]
//! endpoints = ["https://primary/graphql", "https://secondary/graphql"]
//! username = "loader"
//! ```
//!
//! Every section is optional. Command-line flags override the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::{ResilienceConfig, RetryConfig};
use crate::graph::PipelineOptions;
use crate::graph::resolver::DEFAULT_BATCH_SIZE;

/// Directory name under the platform config dir
pub const APP_DIR: &str = "sheetgraph";

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub import: ImportSettings,
    pub http: HttpSettings,
    pub profiles: BTreeMap<String, Profile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub batch_size: usize,
    pub nested_compositions: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            nested_compositions: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            timeout_secs: 60,
            max_attempts: retry.max_attempts,
            initial_delay_ms: retry.base_delay.as_millis() as u64,
            backoff_multiplier: retry.backoff_multiplier,
            max_delay_ms: retry.max_delay.as_millis() as u64,
        }
    }
}

impl HttpSettings {
    pub fn resilience(&self) -> ResilienceConfig {
        ResilienceConfig::default()
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_retry(RetryConfig {
                max_attempts: self.max_attempts.max(1),
                base_delay: Duration::from_millis(self.initial_delay_ms),
                max_delay: Duration::from_millis(self.max_delay_ms),
                backoff_multiplier: self.backoff_multiplier,
            })
    }
}

/// Named endpoint preset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Tried in order; the first one that answers wins
    pub endpoints: Vec<String>,
    pub username: Option<String>,
}

impl Config {
    /// Platform config file path (`~/.config/sheetgraph/config.toml` on Linux)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(CONFIG_FILE)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid configuration")
    }

    /// Load `path`, or the default path when `None`
    ///
    /// A missing default file yields the default configuration; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (Self::default_path(), false),
        };
        if !explicit && !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            batch_size: self.import.batch_size.max(1),
            nested_compositions: self.import.nested_compositions,
            dry_run: false,
        }
    }
}
