//! Mock serial backend for testing.
//!
//! `MockSerialPort` behaves like an open/closed serial device without any
//! hardware. Clones share state, so a test can keep one clone for
//! inspection after handing another to a [`SerialPort`](super::SerialPort).

use super::traits::{SerialBackend, SerialConfiguration};
use crate::error::{ErrorCode, TransportResult};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// One observed backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Open,
    Close,
    WriteStarted(Vec<u8>),
    WriteFinished(Vec<u8>),
    ReadStarted(usize),
    ReadFinished(Vec<u8>),
    Flush,
}

#[derive(Debug, Default)]
struct MockPortState {
    open: bool,
    /// Bytes returned by subsequent reads.
    read_queue: VecDeque<u8>,
    /// Every completed write, in order.
    write_log: Vec<Vec<u8>>,
    calls: Vec<MockCall>,
    /// Error returned by the next read or write.
    fail_next_io: Option<ErrorCode>,
    /// Error returned by the next open.
    fail_next_open: Option<ErrorCode>,
    /// Upper bound on bytes accepted per write.
    write_limit: Option<usize>,
    /// Time spent inside each read or write.
    io_delay: Duration,
    flush_count: usize,
}

/// Mock serial backend.
///
/// # Example
/// ```
/// use sensor_link::port::{MockSerialPort, SerialBackend};
///
/// let mut port = MockSerialPort::new();
/// port.open().unwrap();
/// port.enqueue_read(&[0xEF, 0x01]);
///
/// let mut buffer = [0u8; 4];
/// assert_eq!(port.read(&mut buffer), Ok(2));
/// assert_eq!(port.write(b"\x01\x02"), Ok(2));
/// assert_eq!(port.write_log(), vec![vec![0x01, 0x02]]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    config: SerialConfiguration,
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    pub fn new() -> Self {
        Self::with_configuration(SerialConfiguration::new("MOCK0"))
    }

    pub fn with_configuration(config: SerialConfiguration) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(MockPortState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockPortState> {
        // A panicking test thread must not hide the log from the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue bytes for subsequent reads.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state().read_queue.extend(data);
    }

    /// Make the next read or write fail with `code`.
    pub fn fail_next_io(&self, code: ErrorCode) {
        self.state().fail_next_io = Some(code);
    }

    /// Make the next open fail with `code`.
    pub fn fail_next_open(&self, code: ErrorCode) {
        self.state().fail_next_open = Some(code);
    }

    /// Accept at most `limit` bytes per write, producing short writes.
    pub fn set_write_limit(&self, limit: Option<usize>) {
        self.state().write_limit = limit;
    }

    /// Spend `delay` inside every read and write.
    pub fn set_io_delay(&self, delay: Duration) {
        self.state().io_delay = delay;
    }

    /// Every completed write, in order.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.state().write_log.clone()
    }

    /// Every backend call, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    pub fn flush_count(&self) -> usize {
        self.state().flush_count
    }

    pub fn available_bytes(&self) -> usize {
        self.state().read_queue.len()
    }

    fn delay(&self) {
        let delay = self.state().io_delay;
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}

impl Default for MockSerialPort {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialBackend for MockSerialPort {
    fn open(&mut self) -> TransportResult<()> {
        let mut state = self.state();
        state.calls.push(MockCall::Open);
        if state.open {
            return Ok(());
        }
        if let Some(code) = state.fail_next_open.take() {
            return Err(code);
        }
        state.open = true;
        Ok(())
    }

    fn open_with(&mut self, config: SerialConfiguration) -> TransportResult<()> {
        self.config = config;
        self.open()
    }

    fn close(&mut self) {
        let mut state = self.state();
        state.calls.push(MockCall::Close);
        state.open = false;
    }

    fn is_open(&self) -> bool {
        self.state().open
    }

    fn write(&mut self, data: &[u8]) -> TransportResult<usize> {
        {
            let mut state = self.state();
            state.calls.push(MockCall::WriteStarted(data.to_vec()));
            if !state.open {
                return Err(ErrorCode::PortError);
            }
            if let Some(code) = state.fail_next_io.take() {
                return Err(code);
            }
        }

        self.delay();

        let mut state = self.state();
        let accepted = state.write_limit.map_or(data.len(), |limit| data.len().min(limit));
        let written = data[..accepted].to_vec();
        state.write_log.push(written.clone());
        state.calls.push(MockCall::WriteFinished(written));
        Ok(accepted)
    }

    fn read(&mut self, buffer: &mut [u8]) -> TransportResult<usize> {
        {
            let mut state = self.state();
            state.calls.push(MockCall::ReadStarted(buffer.len()));
            if !state.open {
                return Err(ErrorCode::PortError);
            }
            if let Some(code) = state.fail_next_io.take() {
                return Err(code);
            }
        }

        self.delay();

        let mut state = self.state();
        let count = buffer.len().min(state.read_queue.len());
        for (slot, byte) in buffer.iter_mut().zip(state.read_queue.drain(..count)) {
            *slot = byte;
        }
        state.calls.push(MockCall::ReadFinished(buffer[..count].to_vec()));
        Ok(count)
    }

    fn flush(&mut self) {
        let mut state = self.state();
        state.calls.push(MockCall::Flush);
        if state.open {
            state.read_queue.clear();
            state.flush_count += 1;
        }
    }

    fn configuration(&self) -> &SerialConfiguration {
        &self.config
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("path", &self.config.path)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}
