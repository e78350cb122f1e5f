//! Configuration schema definitions.
//!
//! All sections default sensibly, so an empty file is a valid config.

use super::error::{ConfigError, ConfigResult};
use crate::port::{is_supported_baud, SerialConfiguration, DEFAULT_QUEUE_CAPACITY};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device and line settings
    pub serial: SerialConfiguration,
    /// Async dispatch settings
    pub dispatcher: DispatcherConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values the transport would refuse at open time.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.serial.path.trim().is_empty() {
            return Err(ConfigError::validation("serial.path", "must not be empty"));
        }
        if !is_supported_baud(self.serial.baud) {
            return Err(ConfigError::validation(
                "serial.baud",
                format!("unsupported baud rate {}", self.serial.baud),
            ));
        }
        if self.dispatcher.queue_capacity == 0 {
            return Err(ConfigError::validation(
                "dispatcher.queue_capacity",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Async dispatch configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Operations that may wait behind the running one
    pub queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive: "trace", "debug", "info", "warn", "error", or a
    /// full `EnvFilter` expression
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}
