//! Shared fixtures for transport integration tests.
//!
//! The "device" in these tests is the slave side of a pseudo-terminal pair;
//! the test keeps the master side and plays the sensor.

#![allow(dead_code)]

use sensor_link::port::{SerialConfiguration, TransportEvent, TransportObserver};
use std::ffi::{CStr, CString};
use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, FromRawFd};
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// GetEcho command packet as a protocol layer would frame it.
pub const GET_ECHO: [u8; 12] = [
    0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x03, 0x53, 0x00, 0x57,
];

/// Acknowledgement packet with confirmation code 0x00.
pub const ECHO_ACK: [u8; 12] = [
    0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x07, 0x00, 0x03, 0x00, 0x00, 0x0A,
];

/// Master side of a pseudo-terminal. Dropping it hangs up the slave.
pub struct Pty {
    master: File,
    slave_path: String,
}

impl Pty {
    pub fn open() -> Self {
        unsafe {
            let fd = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY);
            assert!(fd >= 0, "posix_openpt failed");
            let master = File::from_raw_fd(fd);
            assert_eq!(libc::grantpt(fd), 0, "grantpt failed");
            assert_eq!(libc::unlockpt(fd), 0, "unlockpt failed");

            let mut name = [0 as libc::c_char; 128];
            assert_eq!(
                libc::ptsname_r(fd, name.as_mut_ptr(), name.len()),
                0,
                "ptsname_r failed"
            );
            let slave_path = CStr::from_ptr(name.as_ptr())
                .to_string_lossy()
                .into_owned();

            Self { master, slave_path }
        }
    }

    pub fn slave_path(&self) -> &str {
        &self.slave_path
    }

    /// Configuration for the slave with short timeouts.
    pub fn config(&self) -> SerialConfiguration {
        SerialConfiguration::new(self.slave_path.clone()).with_timeouts(200, 200)
    }

    /// Play the sensor: push bytes toward the transport.
    pub fn reply(&mut self, data: &[u8]) {
        self.master.write_all(data).expect("write to pty master");
        self.master.flush().expect("flush pty master");
    }

    /// Collect exactly `len` bytes the transport sent, or fail after `timeout`.
    pub fn expect_bytes(&mut self, len: usize, timeout: Duration) -> Vec<u8> {
        let mut received = Vec::with_capacity(len);
        let deadline = Instant::now() + timeout;

        while received.len() < len {
            let remaining = deadline.saturating_duration_since(Instant::now());
            assert!(
                wait_readable(self.master.as_raw_fd(), remaining),
                "timed out with {} of {} bytes",
                received.len(),
                len
            );
            let mut chunk = vec![0u8; len - received.len()];
            let n = self.master.read(&mut chunk).expect("read from pty master");
            received.extend_from_slice(&chunk[..n]);
        }
        received
    }

    /// True if the transport sent nothing within `timeout`.
    pub fn is_quiet(&self, timeout: Duration) -> bool {
        !wait_readable(self.master.as_raw_fd(), timeout)
    }
}

fn wait_readable(fd: i32, timeout: Duration) -> bool {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let ms = timeout.as_millis().min(i32::MAX as u128) as i32;
    unsafe { libc::poll(&mut pfd, 1, ms) > 0 }
}

/// Create a FIFO at `path` and fill its pipe buffer so that nothing more
/// can be written. The returned file keeps the buffer alive.
pub fn full_fifo(path: &Path) -> File {
    let c_path = CString::new(path.to_string_lossy().as_bytes()).expect("path");
    unsafe {
        assert_eq!(libc::mkfifo(c_path.as_ptr(), 0o600), 0, "mkfifo failed");
        let fd = libc::open(c_path.as_ptr(), libc::O_RDWR | libc::O_NONBLOCK);
        assert!(fd >= 0, "open fifo failed");
        let fifo = File::from_raw_fd(fd);

        let block = [0xAAu8; 4096];
        while libc::write(fd, block.as_ptr().cast(), block.len()) > 0 {}
        // Top off whatever partial space remains.
        while libc::write(fd, block.as_ptr().cast(), 1) == 1 {}

        fifo
    }
}

/// Observer that keeps a debug rendering of every event.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn saw(&self, prefix: &str) -> bool {
        self.events().iter().any(|e| e.starts_with(prefix))
    }
}

impl TransportObserver for RecordingObserver {
    fn on_event(&self, event: &TransportEvent<'_>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}
