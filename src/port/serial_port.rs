//! Public serial transport.
//!
//! `SerialPort` is the one type callers hold. Sync calls run on the
//! caller's thread; async calls go through the port's [`Dispatcher`].
//! Both paths take the same backend lock, so mixing them never interleaves
//! two operations on one descriptor.

use super::async_port::{Dispatcher, PendingIo, DEFAULT_QUEUE_CAPACITY};
use super::sync_port::SyncSerialPort;
use super::traits::{SerialBackend, SerialConfiguration, Transport};
use crate::error::TransportResult;
use parking_lot::Mutex;
use std::sync::Arc;

/// Move-only owner of one serial device.
///
/// # Example
/// ```no_run
/// use sensor_link::port::{SerialConfiguration, SerialPort};
///
/// let mut port = SerialPort::with_configuration(SerialConfiguration::new("/dev/ttyUSB0"));
/// port.open()?;
/// port.flush();
/// let sent = port.send(&[0xEF, 0x01, 0xFF, 0xFF])?;
/// assert_eq!(sent, 4);
///
/// let reply = port.recv_async(32).wait()?;
/// println!("{} bytes back", reply.len());
/// # Ok::<(), sensor_link::ErrorCode>(())
/// ```
pub struct SerialPort<B: SerialBackend + 'static = SyncSerialPort> {
    backend: Arc<Mutex<B>>,
    dispatcher: Dispatcher<B>,
}

impl SerialPort<SyncSerialPort> {
    /// A closed port with the default configuration (`/dev/ttyAMA0`, 57600 8-N-1).
    pub fn new() -> Self {
        Self::from_backend(SyncSerialPort::new())
    }

    /// A closed port that opens `config` on the next `open`.
    pub fn with_configuration(config: SerialConfiguration) -> Self {
        Self::from_backend(SyncSerialPort::with_configuration(config))
    }
}

impl Default for SerialPort<SyncSerialPort> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: SerialBackend + 'static> SerialPort<B> {
    pub fn from_backend(backend: B) -> Self {
        let backend = Arc::new(Mutex::new(backend));
        let dispatcher = Dispatcher::new(Arc::clone(&backend), DEFAULT_QUEUE_CAPACITY);
        Self {
            backend,
            dispatcher,
        }
    }

    /// Bound the async queue. Only effective before the first async call.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.dispatcher.set_capacity(capacity);
        self
    }

    pub fn open(&mut self) -> TransportResult<()> {
        self.backend.lock().open()
    }

    pub fn open_with(&mut self, config: SerialConfiguration) -> TransportResult<()> {
        self.backend.lock().open_with(config)
    }

    pub fn close(&mut self) {
        self.backend.lock().close();
    }

    /// Waits for an in-flight async operation to finish first.
    pub fn is_open(&self) -> bool {
        self.backend.lock().is_open()
    }

    /// Write once; the count may be smaller than `data.len()`.
    pub fn send(&mut self, data: &[u8]) -> TransportResult<usize> {
        self.backend.lock().write(data)
    }

    /// Read once into `buffer`; zero means the read timeout elapsed.
    pub fn recv(&mut self, buffer: &mut [u8]) -> TransportResult<usize> {
        self.backend.lock().read(buffer)
    }

    pub fn flush(&mut self) {
        self.backend.lock().flush();
    }

    /// Queue a write behind earlier async operations.
    pub fn send_async(&mut self, data: impl Into<Vec<u8>>) -> PendingIo<usize> {
        let data = data.into();
        self.dispatcher.submit(move |backend: &mut B| backend.write(&data))
    }

    /// Queue a read of up to `len` bytes. The returned vector holds exactly
    /// the bytes read and is empty when the read timed out.
    pub fn recv_async(&mut self, len: usize) -> PendingIo<Vec<u8>> {
        self.dispatcher.submit(move |backend: &mut B| {
            let mut buffer = vec![0u8; len];
            let count = backend.read(&mut buffer)?;
            buffer.truncate(count);
            Ok(buffer)
        })
    }

    /// Snapshot of the configuration used by the next `open`.
    pub fn configuration(&self) -> SerialConfiguration {
        self.backend.lock().configuration().clone()
    }
}

impl<B: SerialBackend + 'static> Transport for SerialPort<B> {
    fn open(&mut self) -> TransportResult<()> {
        SerialPort::open(self)
    }

    fn close(&mut self) {
        SerialPort::close(self)
    }

    fn is_open(&self) -> bool {
        SerialPort::is_open(self)
    }

    fn send(&mut self, data: &[u8]) -> TransportResult<usize> {
        SerialPort::send(self, data)
    }

    fn recv(&mut self, buffer: &mut [u8]) -> TransportResult<usize> {
        SerialPort::recv(self, buffer)
    }

    fn send_async(&mut self, data: Vec<u8>) -> PendingIo<usize> {
        SerialPort::send_async(self, data)
    }

    fn recv_async(&mut self, len: usize) -> PendingIo<Vec<u8>> {
        SerialPort::recv_async(self, len)
    }

    fn flush(&mut self) {
        SerialPort::flush(self)
    }
}

impl<B: SerialBackend + 'static> std::fmt::Debug for SerialPort<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("backend", &self.backend)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}
