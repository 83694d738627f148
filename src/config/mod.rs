//! Configuration management
//!
//! Loads and validates the pipeline's TOML configuration. Every section
//! and field is optional; missing values take their defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod types;

pub use types::{GrabbableConfig, LoggingConfig, OutputConfig};

use crate::output::OutputSettings;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Output queue configuration
    #[serde(default)]
    pub output: OutputConfig,
    /// Grabbable state engine configuration
    #[serde(default)]
    pub grabbable: GrabbableConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.output.min_event_interval_ms > 1000 {
            anyhow::bail!(
                "min_event_interval_ms ({}) must not exceed 1000",
                self.output.min_event_interval_ms
            );
        }

        if self.output.max_drain_wait_ms == 0 {
            anyhow::bail!("max_drain_wait_ms must be greater than 0");
        }

        if self.grabbable.history_limit == 0 {
            anyhow::bail!("history_limit must be greater than 0");
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Invalid log level: {}", self.logging.level),
        }

        Ok(())
    }

    /// Output queue settings
    ///
    /// Double-click values below their floors are raised to them.
    pub fn to_output_settings(&self) -> OutputSettings {
        OutputSettings {
            post_backend: self.output.post_backend,
            min_event_interval: Duration::from_millis(self.output.min_event_interval_ms),
            max_drain_wait: Duration::from_millis(self.output.max_drain_wait_ms),
            double_click_interval: Duration::from_millis(
                self.output.double_click_interval_ms.max(1) as u64,
            ),
            double_click_distance: self.output.double_click_distance.max(0) as f64,
        }
    }
}
