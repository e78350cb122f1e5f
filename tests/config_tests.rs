//! Configuration file resolution and environment overrides.

use pretty_assertions::assert_eq;
use sensor_link::config::{ConfigError, ConfigLoader, LogFormat};
use sensor_link::port::{FlowControl, Parity};
use serial_test::serial;
use std::env;

const OVERRIDES: &[&str] = &[
    "SENSOR_LINK_CONFIG",
    "SENSOR_LINK_SERIAL_PATH",
    "SENSOR_LINK_SERIAL_BAUD",
    "SENSOR_LINK_SERIAL_READ_TIMEOUT_MS",
    "SENSOR_LINK_SERIAL_WRITE_TIMEOUT_MS",
    "SENSOR_LINK_LOG_LEVEL",
];

fn clear_env() {
    for var in OVERRIDES {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_config_env_points_at_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(
        &path,
        r#"
        [serial]
        path = "/dev/ttyUSB3"
        baud = 115200
        parity = "odd"
        flow_control = "hardware"
        read_timeout_ms = 250

        [dispatcher]
        queue_capacity = 8

        [logging]
        level = "sensor_link=trace"
        format = "compact"
        "#,
    )
    .unwrap();

    env::set_var("SENSOR_LINK_CONFIG", &path);
    let loader = ConfigLoader::load().unwrap();
    clear_env();

    let config = loader.config();
    assert_eq!(loader.config_path.as_deref(), Some(path.as_path()));
    assert_eq!(config.serial.path, "/dev/ttyUSB3");
    assert_eq!(config.serial.baud, 115200);
    assert_eq!(config.serial.parity, Parity::Odd);
    assert_eq!(config.serial.flow_control, FlowControl::Hardware);
    assert_eq!(config.serial.read_timeout_ms, 250);
    assert_eq!(config.serial.write_timeout_ms, 1000);
    assert_eq!(config.dispatcher.queue_capacity, 8);
    assert_eq!(config.logging.level, "sensor_link=trace");
    assert_eq!(config.logging.format, LogFormat::Compact);
}

#[test]
#[serial]
fn test_env_overrides_win_over_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sensor-link.toml");
    std::fs::write(&path, "[serial]\npath = \"/dev/ttyS0\"\nbaud = 9600\n").unwrap();

    env::set_var("SENSOR_LINK_SERIAL_PATH", "/dev/ttyACM0");
    env::set_var("SENSOR_LINK_SERIAL_BAUD", "57600");
    env::set_var("SENSOR_LINK_SERIAL_WRITE_TIMEOUT_MS", "50");
    env::set_var("SENSOR_LINK_LOG_LEVEL", "debug");
    let config = ConfigLoader::load_from(&path).unwrap().into_config();
    clear_env();

    assert_eq!(config.serial.path, "/dev/ttyACM0");
    assert_eq!(config.serial.baud, 57600);
    assert_eq!(config.serial.write_timeout_ms, 50);
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_missing_config_env_file_falls_back_to_defaults() {
    clear_env();
    env::set_var("SENSOR_LINK_CONFIG", "/nonexistent/sensor-link.toml");
    let loader = ConfigLoader::load().unwrap();
    clear_env();

    assert!(loader.config_path.is_none());
    assert_eq!(loader.config().serial.path, "/dev/ttyAMA0");
}

#[test]
#[serial]
fn test_malformed_file_is_a_parse_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sensor-link.toml");
    std::fs::write(&path, "[serial\nbaud = ").unwrap();

    let err = ConfigLoader::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
}

#[test]
#[serial]
fn test_unknown_parity_is_rejected() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sensor-link.toml");
    std::fs::write(&path, "[serial]\nparity = \"mark\"\n").unwrap();

    assert!(ConfigLoader::load_from(&path).is_err());
}

#[test]
#[serial]
fn test_missing_file_is_a_read_error() {
    clear_env();
    let err = ConfigLoader::load_from("/nonexistent/sensor-link.toml").unwrap_err();
    assert!(matches!(err, ConfigError::ReadError { .. }));
}
