//! Thin wrappers over the POSIX serial API.
//!
//! Everything `unsafe` in the port layer lives here. Callers get
//! `io::Result`s and map them onto [`ErrorCode`](crate::error::ErrorCode).

use super::traits::SerialConfiguration;
use std::io;

/// Readiness to wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Readiness {
    Read,
    Write,
}

/// Line-discipline step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConfigureError {
    pub stage: &'static str,
}

pub(crate) use imp::*;

#[cfg(unix)]
mod imp {
    use super::{ConfigureError, Readiness, SerialConfiguration};
    use crate::port::traits::{DataBits, FlowControl, Parity, StopBits};
    use std::ffi::CString;
    use std::io;
    use std::mem;

    /// Open `path` read/write, non-blocking, without becoming its
    /// controlling terminal.
    pub(crate) fn open_device(path: &str) -> io::Result<i32> {
        let path = CString::new(path).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        // SAFETY: `path` is a valid NUL-terminated string for the call.
        let fd = unsafe {
            libc::open(
                path.as_ptr(),
                libc::O_RDWR | libc::O_NOCTTY | libc::O_NONBLOCK,
            )
        };
        if fd < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(fd)
        }
    }

    /// Wait up to `timeout_ms` for `fd` to become ready.
    ///
    /// `Ok(false)` means the bound elapsed with no readiness event.
    pub(crate) fn wait_ready(fd: i32, readiness: Readiness, timeout_ms: u32) -> io::Result<bool> {
        let events = match readiness {
            Readiness::Read => libc::POLLIN,
            Readiness::Write => libc::POLLOUT,
        };
        let mut pfd = libc::pollfd {
            fd,
            events,
            revents: 0,
        };
        let timeout = i32::try_from(timeout_ms).unwrap_or(i32::MAX);
        // SAFETY: `pfd` is a single valid pollfd that outlives the call.
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(rc > 0)
        }
    }

    pub(crate) fn write(fd: i32, data: &[u8]) -> io::Result<usize> {
        // SAFETY: `data` is valid for `data.len()` bytes.
        let rc = unsafe { libc::write(fd, data.as_ptr().cast(), data.len()) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(rc as usize)
        }
    }

    pub(crate) fn read(fd: i32, buffer: &mut [u8]) -> io::Result<usize> {
        // SAFETY: `buffer` is valid and writable for `buffer.len()` bytes.
        let rc = unsafe { libc::read(fd, buffer.as_mut_ptr().cast(), buffer.len()) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(rc as usize)
        }
    }

    /// Discard unread input and unsent output.
    pub(crate) fn flush(fd: i32) -> io::Result<()> {
        // SAFETY: plain syscall on a descriptor we own.
        if unsafe { libc::tcflush(fd, libc::TCIOFLUSH) } != 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn speed_for(baud: u32) -> Option<libc::speed_t> {
        let speed = match baud {
            2400 => libc::B2400,
            4800 => libc::B4800,
            9600 => libc::B9600,
            19200 => libc::B19200,
            38400 => libc::B38400,
            57600 => libc::B57600,
            115200 => libc::B115200,
            _ => return None,
        };
        Some(speed)
    }

    /// Translate `config` into termios settings and commit them.
    ///
    /// `before_commit` runs after every setting is computed and before
    /// `tcsetattr`. Earlier steps are not rolled back on failure.
    pub(crate) fn configure_line(
        fd: i32,
        config: &SerialConfiguration,
        before_commit: &mut dyn FnMut(),
    ) -> Result<(), ConfigureError> {
        let fail = |stage| ConfigureError { stage };

        // SAFETY: termios is plain old data; tcgetattr fills it in.
        let mut tty: libc::termios = unsafe { mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &mut tty) } != 0 {
            return Err(fail("tcgetattr"));
        }

        // SAFETY: `tty` was initialised by tcgetattr above.
        unsafe { libc::cfmakeraw(&mut tty) };

        let speed = speed_for(config.baud).ok_or(fail("baud rate"))?;
        if unsafe { libc::cfsetispeed(&mut tty, speed) } != 0 {
            return Err(fail("input speed"));
        }
        if unsafe { libc::cfsetospeed(&mut tty, speed) } != 0 {
            return Err(fail("output speed"));
        }

        // Receiver on, modem control lines ignored.
        tty.c_cflag |= libc::CLOCAL | libc::CREAD;

        tty.c_cflag &= !libc::CSIZE;
        tty.c_cflag |= match config.data_bits {
            DataBits::Five => libc::CS5,
            DataBits::Six => libc::CS6,
            DataBits::Seven => libc::CS7,
            DataBits::Eight => libc::CS8,
        };

        match config.parity {
            Parity::None => {
                tty.c_cflag &= !libc::PARENB;
                tty.c_iflag &= !libc::INPCK;
            }
            Parity::Odd => {
                tty.c_cflag |= libc::PARODD | libc::PARENB;
                tty.c_iflag |= libc::INPCK;
            }
            Parity::Even => {
                tty.c_cflag |= libc::PARENB;
                tty.c_cflag &= !libc::PARODD;
                tty.c_iflag |= libc::INPCK;
            }
        }

        match config.stop_bits {
            StopBits::One => tty.c_cflag &= !libc::CSTOPB,
            StopBits::Two => tty.c_cflag |= libc::CSTOPB,
        }

        match config.flow_control {
            FlowControl::None => {
                tty.c_cflag &= !libc::CRTSCTS;
                tty.c_iflag &= !(libc::IXON | libc::IXOFF | libc::IXANY);
            }
            FlowControl::Software => {
                tty.c_cflag &= !libc::CRTSCTS;
                tty.c_iflag |= libc::IXON | libc::IXOFF;
            }
            FlowControl::Hardware => {
                tty.c_cflag |= libc::CRTSCTS;
                tty.c_iflag &= !(libc::IXON | libc::IXOFF | libc::IXANY);
            }
        }

        // Reads return at once; timeouts are enforced by `wait_ready`.
        tty.c_cc[libc::VMIN] = 0;
        tty.c_cc[libc::VTIME] = 0;

        before_commit();

        // SAFETY: `tty` is fully initialised.
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tty) } != 0 {
            return Err(fail("tcsetattr"));
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_speed_table() {
            assert_eq!(speed_for(57600), Some(libc::B57600));
            assert_eq!(speed_for(115200), Some(libc::B115200));
            assert_eq!(speed_for(230400), None);
            assert_eq!(speed_for(0), None);
        }

        #[test]
        fn test_open_missing_device() {
            let err = open_device("/dev/nonexistent_sensor_port_12345").unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::NotFound);
        }

        #[test]
        fn test_open_rejects_interior_nul() {
            let err = open_device("/dev/tty\0AMA0").unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use super::{ConfigureError, Readiness, SerialConfiguration};
    use std::io;

    fn unsupported() -> io::Error {
        io::Error::new(io::ErrorKind::Unsupported, "POSIX serial devices are not available")
    }

    pub(crate) fn open_device(_path: &str) -> io::Result<i32> {
        Err(unsupported())
    }

    pub(crate) fn wait_ready(_fd: i32, _readiness: Readiness, _timeout_ms: u32) -> io::Result<bool> {
        Err(unsupported())
    }

    pub(crate) fn write(_fd: i32, _data: &[u8]) -> io::Result<usize> {
        Err(unsupported())
    }

    pub(crate) fn read(_fd: i32, _buffer: &mut [u8]) -> io::Result<usize> {
        Err(unsupported())
    }

    pub(crate) fn flush(_fd: i32) -> io::Result<()> {
        Err(unsupported())
    }

    pub(crate) fn configure_line(
        _fd: i32,
        _config: &SerialConfiguration,
        _before_commit: &mut dyn FnMut(),
    ) -> Result<(), ConfigureError> {
        Err(ConfigureError { stage: "tcgetattr" })
    }
}

/// Whether `err` means "nothing to do right now" on a non-blocking fd.
pub(crate) fn is_would_block(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
}
