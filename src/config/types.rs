//! Configuration type definitions

use serde::{Deserialize, Serialize};

use crate::grabbable::DEFAULT_HISTORY_LIMIT;
use crate::output::PostBackend;

/// Output queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where pointing snapshots go ("virtual_hid_device", "display_server_injection")
    #[serde(default)]
    pub post_backend: PostBackend,

    /// Double-click window in milliseconds (injection backend, floor 1)
    #[serde(default = "default_double_click_interval_ms")]
    pub double_click_interval_ms: i64,

    /// Double-click distance in pixels (injection backend, floor 0)
    #[serde(default = "default_double_click_distance")]
    pub double_click_distance: i64,

    /// Minimum spacing between paced key events in milliseconds
    #[serde(default = "default_min_event_interval_ms")]
    pub min_event_interval_ms: u64,

    /// Longest single drain sleep in milliseconds
    #[serde(default = "default_max_drain_wait_ms")]
    pub max_drain_wait_ms: u64,
}

fn default_double_click_interval_ms() -> i64 {
    500
}

fn default_double_click_distance() -> i64 {
    4
}

fn default_min_event_interval_ms() -> u64 {
    5
}

fn default_max_drain_wait_ms() -> u64 {
    3000
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            post_backend: PostBackend::default(),
            double_click_interval_ms: default_double_click_interval_ms(),
            double_click_distance: default_double_click_distance(),
            min_event_interval_ms: default_min_event_interval_ms(),
            max_drain_wait_ms: default_max_drain_wait_ms(),
        }
    }
}

/// Grabbable state engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrabbableConfig {
    /// States kept per device
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl Default for GrabbableConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
