//! Core traits for serial transport abstraction.
//!
//! Defines `SerialConfiguration` and the `SerialBackend` trait that lets
//! both the POSIX port and test doubles sit behind the same facade.

use super::async_port::PendingIo;
use crate::error::TransportResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Baud rates the line discipline accepts.
pub const SUPPORTED_BAUD_RATES: &[u32] = &[2400, 4800, 9600, 19200, 38400, 57600, 115200];

/// Whether `baud` is one of [`SUPPORTED_BAUD_RATES`].
pub fn is_supported_baud(baud: u32) -> bool {
    SUPPORTED_BAUD_RATES.contains(&baud)
}

/// Configuration parameters for a serial device.
///
/// Handed to `open`; replacing it requires another `open_with` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfiguration {
    /// Device path, e.g. `/dev/ttyAMA0`.
    pub path: String,

    /// Baud rate (bits per second).
    pub baud: u32,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Parity checking mode.
    pub parity: Parity,

    /// Flow control mode.
    pub flow_control: FlowControl,

    /// Bound on waiting for write readiness.
    pub write_timeout_ms: u32,

    /// Bound on waiting for read readiness, and for the device to accept
    /// a writer during `open`.
    pub read_timeout_ms: u32,
}

impl Default for SerialConfiguration {
    fn default() -> Self {
        Self {
            path: "/dev/ttyAMA0".to_string(),
            baud: 57600,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
            write_timeout_ms: 1000,
            read_timeout_ms: 1000,
        }
    }
}

impl SerialConfiguration {
    /// Default settings for the device at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_baud(mut self, baud: u32) -> Self {
        self.baud = baud;
        self
    }

    pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn with_flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }

    /// Set both read and write timeouts.
    pub fn with_timeouts(mut self, read_timeout_ms: u32, write_timeout_ms: u32) -> Self {
        self.read_timeout_ms = read_timeout_ms;
        self.write_timeout_ms = write_timeout_ms;
        self
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.read_timeout_ms))
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.write_timeout_ms))
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl DataBits {
    pub fn bits(self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopBits {
    One,
    Two,
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Flow control modes.
///
/// `Software` is XON/XOFF, `Hardware` is RTS/CTS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

/// Synchronous byte transport to one device.
///
/// Implemented by [`SyncSerialPort`](super::SyncSerialPort) for real ttys
/// and by [`MockSerialPort`](super::MockSerialPort) for tests. Every call
/// is a single attempt: no retries, no short-write completion.
pub trait SerialBackend: Send + std::fmt::Debug {
    /// Open using the stored configuration. Succeeds without effect when
    /// already open.
    fn open(&mut self) -> TransportResult<()>;

    /// Replace the stored configuration, then open.
    fn open_with(&mut self, config: SerialConfiguration) -> TransportResult<()>;

    /// Release the device. Closing a closed backend is a no-op.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Write once; returns how many bytes the device accepted.
    fn write(&mut self, data: &[u8]) -> TransportResult<usize>;

    /// Read once; returns how many bytes landed in `buffer`. Zero means the
    /// read timeout elapsed with nothing to read.
    fn read(&mut self, buffer: &mut [u8]) -> TransportResult<usize>;

    /// Discard pending input and output. No-op when closed.
    fn flush(&mut self);

    /// The configuration used by the next `open`.
    fn configuration(&self) -> &SerialConfiguration;
}

/// What a packet-protocol layer needs from a byte transport.
///
/// Framing is the caller's business: bytes pass through unmodified and
/// in order.
pub trait Transport {
    fn open(&mut self) -> TransportResult<()>;
    fn close(&mut self);
    fn is_open(&self) -> bool;
    fn send(&mut self, data: &[u8]) -> TransportResult<usize>;
    fn recv(&mut self, buffer: &mut [u8]) -> TransportResult<usize>;
    fn send_async(&mut self, data: Vec<u8>) -> PendingIo<usize>;
    fn recv_async(&mut self, len: usize) -> PendingIo<Vec<u8>>;
    fn flush(&mut self);
}
