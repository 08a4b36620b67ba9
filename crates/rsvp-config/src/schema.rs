//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub soak: SoakConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Correlation registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Timeout applied by `send_default` in milliseconds.
    #[serde(default = "default_send_timeout_ms")]
    pub default_send_timeout_ms: u64,

    /// Live entry count at which a leak warning is logged (0 = disabled).
    #[serde(default = "default_live_entry_warn_threshold")]
    pub live_entry_warn_threshold: usize,
}

fn default_send_timeout_ms() -> u64 {
    30_000
}

fn default_live_entry_warn_threshold() -> usize {
    10_000
}

impl RegistryConfig {
    pub fn default_send_timeout(&self) -> Duration {
        Duration::from_millis(self.default_send_timeout_ms)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_send_timeout_ms: default_send_timeout_ms(),
            live_entry_warn_threshold: default_live_entry_warn_threshold(),
        }
    }
}

/// Soak workload configuration used by `rsvp soak`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoakConfig {
    /// Number of concurrent caller tasks.
    #[serde(default = "default_callers")]
    pub callers: usize,

    /// Number of responder tasks serving requests.
    #[serde(default = "default_responders")]
    pub responders: usize,

    /// Requests issued by each caller.
    #[serde(default = "default_requests_per_caller")]
    pub requests_per_caller: usize,

    /// Responder send timeout in milliseconds.
    #[serde(default = "default_soak_send_timeout_ms")]
    pub send_timeout_ms: u64,

    /// Caller receive timeout in milliseconds.
    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,

    /// Fraction of requests whose caller stops listening (0.0..=1.0).
    #[serde(default)]
    pub abandon_ratio: f64,
}

fn default_callers() -> usize {
    64
}

fn default_responders() -> usize {
    8
}

fn default_requests_per_caller() -> usize {
    100
}

fn default_soak_send_timeout_ms() -> u64 {
    1_000
}

fn default_receive_timeout_ms() -> u64 {
    5_000
}

impl Default for SoakConfig {
    fn default() -> Self {
        Self {
            callers: default_callers(),
            responders: default_responders(),
            requests_per_caller: default_requests_per_caller(),
            send_timeout_ms: default_soak_send_timeout_ms(),
            receive_timeout_ms: default_receive_timeout_ms(),
            abandon_ratio: 0.0,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rolling log files (console only when unset).
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}
