//! Serial transport for optical fingerprint sensor modules.
//!
//! This library moves raw bytes between a host and a sensor attached to a
//! POSIX tty. It does not frame packets; a protocol layer sits above it
//! and talks to the [`port::Transport`] trait.
//!
//! # Modules
//!
//! - `error`: Wire-level status codes shared with the sensor protocol
//! - `port`: Device handle, line configuration, blocking and queued I/O
//! - `config`: TOML configuration with environment overrides
//!
//! # Example
//! ```no_run
//! use sensor_link::{SerialConfiguration, SerialPort};
//!
//! let mut port = SerialPort::with_configuration(
//!     SerialConfiguration::new("/dev/ttyUSB0").with_baud(57600),
//! );
//! port.open()?;
//! let written = port.send(&[0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF])?;
//! let mut reply = [0u8; 32];
//! let read = port.recv(&mut reply)?;
//! println!("wrote {written}, read {read}");
//! # Ok::<(), sensor_link::ErrorCode>(())
//! ```

pub mod config;
pub mod error;
pub mod port;

// Re-export commonly used types for convenience
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult, LogFormat};
pub use error::{ErrorCode, TransportResult};
pub use port::{
    DataBits, FlowControl, MockSerialPort, Parity, PendingIo, SerialBackend, SerialConfiguration,
    SerialPort, StopBits, SyncSerialPort, Transport,
};
