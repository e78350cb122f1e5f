//! Synchronous POSIX serial port.
//!
//! Owns the device descriptor through a [`FdHandle`] and drives it with
//! readiness waits bounded by the configured timeouts. Implements
//! [`SerialBackend`] so the facade and the async dispatcher can use it.

use super::handle::FdHandle;
use super::observer::{TracingObserver, TransportEvent, TransportObserver};
use super::sys::{self, Readiness};
use super::traits::{SerialBackend, SerialConfiguration};
use crate::error::{ErrorCode, TransportResult};
use std::sync::Arc;

/// Serial device driven directly through termios, `poll`, `read` and `write`.
///
/// Lifecycle: constructed closed, `open` acquires and configures the
/// device, `close` releases it and keeps the configuration so the port can
/// be reopened.
pub struct SyncSerialPort {
    /// Used by the next `open`.
    config: SerialConfiguration,
    /// Invalid while closed.
    fd: FdHandle,
    observer: Arc<dyn TransportObserver>,
}

impl SyncSerialPort {
    /// A closed port with the default configuration.
    pub fn new() -> Self {
        Self::with_configuration(SerialConfiguration::default())
    }

    /// A closed port that will open `config` on the next `open`.
    pub fn with_configuration(config: SerialConfiguration) -> Self {
        Self {
            config,
            fd: FdHandle::invalid(),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the telemetry sink.
    pub fn with_observer(mut self, observer: Arc<dyn TransportObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Open `config.path` and configure it.
    ///
    /// # Example
    /// ```no_run
    /// use sensor_link::port::{SerialConfiguration, SyncSerialPort};
    ///
    /// let port = SyncSerialPort::open_path(SerialConfiguration::new("/dev/ttyUSB0"))?;
    /// # Ok::<(), sensor_link::ErrorCode>(())
    /// ```
    pub fn open_path(config: SerialConfiguration) -> TransportResult<Self> {
        let mut port = Self::with_configuration(config);
        port.open()?;
        Ok(port)
    }

    /// The raw descriptor, or `-1` while closed. Still owned by the port.
    pub fn as_raw_fd(&self) -> i32 {
        self.fd.get()
    }

    fn emit(&self, event: TransportEvent<'_>) {
        self.observer.on_event(&event);
    }

    fn open_failed(&mut self, code: ErrorCode, stage: &'static str) -> ErrorCode {
        self.fd.reset();
        self.emit(TransportEvent::OpenFailed {
            path: &self.config.path,
            code,
            stage,
        });
        code
    }

    fn io_failed(&self, operation: &'static str, code: ErrorCode, stage: &'static str) -> ErrorCode {
        self.emit(TransportEvent::IoFailed {
            operation,
            code,
            stage,
        });
        code
    }

    /// Apply the stored configuration to the open descriptor.
    fn configure(&mut self) -> TransportResult<()> {
        let fd = self.fd.get();
        let observer = Arc::clone(&self.observer);
        let mut flush_before_commit = || flush_fd(fd, observer.as_ref());

        sys::configure_line(fd, &self.config, &mut flush_before_commit)
            .map_err(|e| self.open_failed(ErrorCode::PortError, e.stage))?;

        self.emit(TransportEvent::Configured {
            path: &self.config.path,
        });
        Ok(())
    }
}

fn flush_fd(fd: i32, observer: &dyn TransportObserver) {
    match sys::flush(fd) {
        Ok(()) => observer.on_event(&TransportEvent::Flushed),
        Err(_) => observer.on_event(&TransportEvent::FlushFailed { reason: "tcflush" }),
    }
}

impl Default for SyncSerialPort {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialBackend for SyncSerialPort {
    fn open(&mut self) -> TransportResult<()> {
        self.emit(TransportEvent::Opening {
            path: &self.config.path,
            baud: self.config.baud,
        });

        if self.is_open() {
            self.emit(TransportEvent::AlreadyOpen {
                path: &self.config.path,
            });
            return Ok(());
        }

        match sys::open_device(&self.config.path) {
            Ok(fd) => self.fd.reset_to(fd),
            Err(_) => return Err(self.open_failed(ErrorCode::PortError, "open")),
        }

        match sys::wait_ready(self.fd.get(), Readiness::Write, self.config.read_timeout_ms) {
            Ok(true) => {}
            Ok(false) => return Err(self.open_failed(ErrorCode::Timeout, "poll")),
            Err(_) => return Err(self.open_failed(ErrorCode::PortError, "poll")),
        }

        self.configure()?;

        self.emit(TransportEvent::Opened {
            path: &self.config.path,
        });
        Ok(())
    }

    fn open_with(&mut self, config: SerialConfiguration) -> TransportResult<()> {
        self.config = config;
        self.open()
    }

    fn close(&mut self) {
        let was_open = self.is_open();
        self.fd.reset();
        self.emit(TransportEvent::Closed {
            path: &self.config.path,
            was_open,
        });
    }

    fn is_open(&self) -> bool {
        self.fd.is_valid()
    }

    fn write(&mut self, data: &[u8]) -> TransportResult<usize> {
        if !self.is_open() {
            return Err(self.io_failed("write", ErrorCode::PortError, "not open"));
        }

        // An elapsed wait is not an error here: the write below decides.
        if sys::wait_ready(self.fd.get(), Readiness::Write, self.config.write_timeout_ms).is_err() {
            return Err(self.io_failed("write", ErrorCode::PortError, "poll"));
        }

        let written = sys::write(self.fd.get(), data)
            .map_err(|_| self.io_failed("write", ErrorCode::PortError, "write"))?;

        self.emit(TransportEvent::Wrote {
            data: &data[..written],
        });
        Ok(written)
    }

    fn read(&mut self, buffer: &mut [u8]) -> TransportResult<usize> {
        if !self.is_open() {
            return Err(self.io_failed("read", ErrorCode::PortError, "not open"));
        }

        if sys::wait_ready(self.fd.get(), Readiness::Read, self.config.read_timeout_ms).is_err() {
            return Err(self.io_failed("read", ErrorCode::PortError, "poll"));
        }

        // A failed read after the wait is reported as a timeout.
        let count = match sys::read(self.fd.get(), buffer) {
            Ok(count) => count,
            Err(e) if sys::is_would_block(&e) => 0,
            Err(_) => return Err(self.io_failed("read", ErrorCode::Timeout, "read")),
        };

        self.emit(TransportEvent::Read {
            data: &buffer[..count],
        });
        Ok(count)
    }

    fn flush(&mut self) {
        if !self.is_open() {
            self.emit(TransportEvent::FlushFailed { reason: "port not open" });
            return;
        }
        flush_fd(self.fd.get(), self.observer.as_ref());
    }

    fn configuration(&self) -> &SerialConfiguration {
        &self.config
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("path", &self.config.path)
            .field("baud", &self.config.baud)
            .field("open", &self.is_open())
            .finish()
    }
}
