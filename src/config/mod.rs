//! File-based configuration for tools built on the transport.
//!
//! The transport never reads files or the environment on its own; a
//! binary calls [`ConfigLoader`] and hands the resulting
//! [`SerialConfiguration`](crate::port::SerialConfiguration) to `open`.
//!
//! # Configuration Resolution
//!
//! 1. `SENSOR_LINK_CONFIG` environment variable (explicit path)
//! 2. `./sensor-link.toml` (current directory)
//! 3. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! - `SENSOR_LINK_SERIAL_PATH=/dev/ttyUSB0`
//! - `SENSOR_LINK_SERIAL_BAUD=115200`
//! - `SENSOR_LINK_SERIAL_READ_TIMEOUT_MS=500`
//! - `SENSOR_LINK_SERIAL_WRITE_TIMEOUT_MS=500`
//! - `SENSOR_LINK_LOG_LEVEL=debug`
//!
//! # Example
//!
//! ```toml
//! [serial]
//! path = "/dev/ttyUSB0"
//! baud = 57600
//! parity = "none"
//!
//! [dispatcher]
//! queue_capacity = 16
//!
//! [logging]
//! level = "debug"
//! format = "compact"
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{resolve_config_path, ConfigLoader};
pub use schema::{Config, DispatcherConfig, LogFormat, LoggingConfig};
