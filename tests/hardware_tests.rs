//! Tests requiring a fingerprint sensor on a real serial line.
//!
//! These tests are skipped unless the `hardware-tests` feature is enabled,
//! and ignored by default even then.
//!
//! # Running Hardware Tests
//!
//! ```bash
//! export TEST_PORT=/dev/ttyUSB0   # required
//! export TEST_BAUD=57600          # optional, default: 57600
//!
//! cargo test --features hardware-tests -- --ignored
//! ```

#![cfg(all(unix, feature = "hardware-tests"))]

mod common;

use common::{ECHO_ACK, GET_ECHO};
use sensor_link::{ErrorCode, SerialConfiguration, SerialPort};
use std::env;

/// Get the test port from environment variable.
fn get_test_port() -> Option<String> {
    env::var("TEST_PORT").ok()
}

/// Get the test baud rate from environment variable (default: 57600).
fn get_test_baud() -> u32 {
    env::var("TEST_BAUD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(57600)
}

/// Open the sensor port, or `None` when no hardware is configured.
fn open_sensor() -> Option<SerialPort> {
    let Some(path) = get_test_port() else {
        println!("Skipping: TEST_PORT not set");
        return None;
    };
    let config = SerialConfiguration::new(path).with_baud(get_test_baud());
    let mut port = SerialPort::with_configuration(config);
    port.open().expect("open sensor port");
    Some(port)
}

fn read_reply(port: &mut SerialPort, len: usize) -> Vec<u8> {
    let mut reply = Vec::new();
    let mut buffer = [0u8; 32];
    while reply.len() < len {
        match port.recv(&mut buffer) {
            Ok(0) => break,
            Ok(n) => reply.extend_from_slice(&buffer[..n]),
            Err(e) => panic!("recv failed: {}", e),
        }
    }
    reply
}

#[test]
#[ignore]
fn test_sensor_acknowledges_echo() {
    let Some(mut port) = open_sensor() else { return };

    port.flush();
    assert_eq!(port.send(&GET_ECHO), Ok(GET_ECHO.len()));

    let reply = read_reply(&mut port, ECHO_ACK.len());
    assert!(reply.len() >= 10, "short reply: {:02X?}", reply);
    assert_eq!(&reply[..7], &ECHO_ACK[..7], "unexpected header: {:02X?}", reply);
    assert_eq!(ErrorCode::from_byte(reply[9]), ErrorCode::Success);
}

#[test]
#[ignore]
fn test_sensor_acknowledges_echo_async() {
    let Some(mut port) = open_sensor() else { return };

    port.flush();
    assert_eq!(port.send_async(GET_ECHO.to_vec()).wait(), Ok(GET_ECHO.len()));

    let reply = port.recv_async(ECHO_ACK.len()).wait().expect("recv_async");
    assert!(reply.starts_with(&ECHO_ACK[..7]), "unexpected reply: {:02X?}", reply);
}

#[test]
#[ignore]
fn test_sensor_reopen_cycles() {
    let Some(mut port) = open_sensor() else { return };

    for _ in 0..3 {
        port.close();
        assert!(!port.is_open());
        port.open().expect("reopen");
        assert!(port.is_open());
    }
}
