//! Transport telemetry.
//!
//! Ports report state transitions and I/O outcomes to an injected
//! `TransportObserver`. The default `TracingObserver` turns them into
//! `tracing` events; tests can plug in their own recorder.

use crate::error::ErrorCode;
use std::fmt::Write as _;
use tracing::{debug, error, trace};

/// Bytes shown in a hex dump before it is truncated.
const HEX_DUMP_LIMIT: usize = 64;

/// Something the transport did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent<'a> {
    Opening { path: &'a str, baud: u32 },
    AlreadyOpen { path: &'a str },
    Opened { path: &'a str },
    OpenFailed { path: &'a str, code: ErrorCode, stage: &'static str },
    Configured { path: &'a str },
    Closed { path: &'a str, was_open: bool },
    Wrote { data: &'a [u8] },
    Read { data: &'a [u8] },
    IoFailed { operation: &'static str, code: ErrorCode, stage: &'static str },
    Flushed,
    FlushFailed { reason: &'static str },
}

/// Receives transport events. Implementations must be cheap and must not
/// call back into the port.
pub trait TransportObserver: Send + Sync {
    fn on_event(&self, event: &TransportEvent<'_>);
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TransportObserver for TracingObserver {
    fn on_event(&self, event: &TransportEvent<'_>) {
        match event {
            TransportEvent::Opening { path, baud } => {
                debug!("Opening serial port {} at {} baud", path, baud)
            }
            TransportEvent::AlreadyOpen { path } => debug!("Serial port {} already open", path),
            TransportEvent::Opened { path } => debug!("Serial port {} open", path),
            TransportEvent::OpenFailed { path, code, stage } => {
                error!(code = code.name(), "Opening serial port {} failed during {}", path, stage)
            }
            TransportEvent::Configured { path } => debug!("Serial port {} configured", path),
            TransportEvent::Closed { path, was_open } => {
                if *was_open {
                    debug!("Serial port {} closed", path)
                } else {
                    debug!("Serial port {} already closed", path)
                }
            }
            TransportEvent::Wrote { data } => {
                trace!("Serial write ({} bytes): [{}]", data.len(), hex_dump(data))
            }
            TransportEvent::Read { data } => {
                trace!("Serial read ({} bytes): [{}]", data.len(), hex_dump(data))
            }
            TransportEvent::IoFailed { operation, code, stage } => {
                error!(code = code.name(), "Serial {} failed during {}", operation, stage)
            }
            TransportEvent::Flushed => debug!("Serial buffers flushed"),
            TransportEvent::FlushFailed { reason } => error!("Flush failed: {}", reason),
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl TransportObserver for NullObserver {
    fn on_event(&self, _event: &TransportEvent<'_>) {}
}

/// Space-separated uppercase hex, truncated after [`HEX_DUMP_LIMIT`] bytes.
pub fn hex_dump(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().min(HEX_DUMP_LIMIT) * 3 + 4);
    for (i, byte) in data.iter().take(HEX_DUMP_LIMIT).enumerate() {
        if i != 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02X}");
    }
    if data.len() > HEX_DUMP_LIMIT {
        out.push_str(" ...");
    }
    out
}
