//! Command-line harness for a fingerprint sensor on a serial line.
//!
//! # Usage
//!
//! ```bash
//! # List serial devices the OS knows about
//! sensor-probe list
//!
//! # Find the baud rate the sensor answers at
//! sensor-probe --port /dev/ttyUSB0 probe
//!
//! # Send raw bytes and print whatever comes back
//! sensor-probe --port /dev/ttyUSB0 --baud 57600 send "EF01 FFFFFFFF 01 0003 53 0057"
//! ```

use clap::{Parser, Subcommand};
use sensor_link::config::{Config, ConfigLoader, LogFormat};
use sensor_link::port::{hex_dump, SerialConfiguration, SerialPort, SUPPORTED_BAUD_RATES};
use sensor_link::ErrorCode;
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command packet asking the sensor to echo back an acknowledgement.
const GET_ECHO: [u8; 12] = [
    0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x03, 0x53, 0x00, 0x57,
];

/// Start of an acknowledgement packet from a sensor at the default address.
const ACK_HEADER: [u8; 7] = [0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x07];

/// Offset of the confirmation code inside an acknowledgement packet.
const CONFIRMATION_OFFSET: usize = 9;

const PROBE_READ_LEN: usize = 32;

#[derive(Parser, Debug)]
#[command(
    name = "sensor-probe",
    version,
    about = "Talk to a fingerprint sensor over a serial line."
)]
struct Args {
    /// Configuration file (defaults to $SENSOR_LINK_CONFIG or ./sensor-link.toml)
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Device path, overriding the configuration
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate, overriding the configuration
    #[arg(short, long)]
    baud: Option<u32>,

    /// Log filter, overriding the configuration and RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports present on this system
    List,

    /// Try each supported baud rate until the sensor acknowledges
    Probe {
        /// Only try these rates, in order
        #[arg(long, value_delimiter = ',')]
        bauds: Vec<u32>,
    },

    /// Write hex bytes and print the reply
    Send {
        /// Bytes as hex, spaces optional (e.g. "EF01 FFFFFFFF")
        hex: Vec<String>,

        /// Maximum reply length
        #[arg(short, long, default_value_t = PROBE_READ_LEN)]
        read: usize,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let loaded = match &args.config {
        Some(path) => ConfigLoader::load_from(path),
        None => ConfigLoader::load(),
    };
    let mut config = match loaded {
        Ok(loader) => loader.into_config(),
        Err(e) => {
            eprintln!("Warning: Failed to load config, using defaults: {}", e);
            ConfigLoader::with_defaults().into_config()
        }
    };
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    init_logging(&config);

    if let Some(port) = &args.port {
        config.serial.path = port.clone();
    }
    if let Some(baud) = args.baud {
        config.serial.baud = baud;
    }

    match args.command {
        Command::List => list_ports(),
        Command::Probe { bauds } => probe(&config, &bauds),
        Command::Send { hex, read } => send(&config, &hex.join(""), read),
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let registry = tracing_subscriber::registry().with(filter);
    let writer = std::io::stderr;

    match config.logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(writer))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(writer))
            .init(),
    }
}

fn list_ports() -> ExitCode {
    use serialport::SerialPortType;

    let ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            eprintln!("Failed to enumerate serial ports: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        let kind = match port.port_type {
            SerialPortType::UsbPort(info) => format!(
                "usb {:04x}:{:04x} {}",
                info.vid,
                info.pid,
                info.product.unwrap_or_default()
            ),
            SerialPortType::BluetoothPort => "bluetooth".to_string(),
            SerialPortType::PciPort => "pci".to_string(),
            SerialPortType::Unknown => "unknown".to_string(),
        };
        println!("{:<24} {}", port.port_name, kind.trim_end());
    }
    ExitCode::SUCCESS
}

fn probe(config: &Config, bauds: &[u32]) -> ExitCode {
    let candidates = probe_order(config.serial.baud, bauds);
    let mut port = SerialPort::new().with_queue_capacity(config.dispatcher.queue_capacity);

    for baud in candidates {
        let attempt = config.serial.clone().with_baud(baud);
        match probe_at(&mut port, attempt) {
            Ok(Some(confirmation)) => {
                println!(
                    "Sensor answered on {} at {} baud ({})",
                    config.serial.path, baud, confirmation
                );
                return ExitCode::SUCCESS;
            }
            Ok(None) => debug!("No acknowledgement at {} baud", baud),
            Err(code) => warn!("Probe at {} baud failed: {}", baud, code),
        }
    }

    eprintln!("No sensor found on {}", config.serial.path);
    ExitCode::FAILURE
}

/// Configured rate first, then the rest of the candidates without repeats.
fn probe_order(preferred: u32, requested: &[u32]) -> Vec<u32> {
    let pool: &[u32] = if requested.is_empty() {
        SUPPORTED_BAUD_RATES
    } else {
        requested
    };

    let mut order = Vec::with_capacity(pool.len());
    if pool.contains(&preferred) {
        order.push(preferred);
    }
    for &baud in pool {
        if !order.contains(&baud) {
            order.push(baud);
        }
    }
    order
}

fn probe_at(
    port: &mut SerialPort,
    config: SerialConfiguration,
) -> Result<Option<ErrorCode>, ErrorCode> {
    let baud = config.baud;
    port.close();
    port.open_with(config)?;
    port.flush();

    let sent = port.send(&GET_ECHO)?;
    if sent != GET_ECHO.len() {
        warn!("Short write at {} baud: {} of {}", baud, sent, GET_ECHO.len());
    }

    let reply = port.recv_async(PROBE_READ_LEN).wait()?;
    debug!("Reply at {} baud: {}", baud, hex_dump(&reply));
    port.close();

    Ok(acknowledgement(&reply))
}

/// Confirmation code of the first acknowledgement packet in `reply`.
fn acknowledgement(reply: &[u8]) -> Option<ErrorCode> {
    let start = reply
        .windows(ACK_HEADER.len())
        .position(|window| window == ACK_HEADER)?;
    let code = reply
        .get(start + CONFIRMATION_OFFSET)
        .map_or(ErrorCode::BadPacket, |&byte| ErrorCode::from_byte(byte));
    Some(code)
}

fn send(config: &Config, hex: &str, read_len: usize) -> ExitCode {
    let bytes = match parse_hex(hex) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut port = SerialPort::with_configuration(config.serial.clone())
        .with_queue_capacity(config.dispatcher.queue_capacity);
    if let Err(code) = port.open() {
        eprintln!("Failed to open {}: {}", config.serial.path, code);
        return ExitCode::FAILURE;
    }

    let written = match port.send_async(bytes.clone()).wait() {
        Ok(n) => n,
        Err(code) => {
            eprintln!("Write failed: {}", code);
            return ExitCode::FAILURE;
        }
    };
    info!("Wrote {} of {} bytes", written, bytes.len());

    match port.recv_async(read_len).wait() {
        Ok(reply) if reply.is_empty() => {
            println!("No reply within {} ms", config.serial.read_timeout_ms);
            ExitCode::SUCCESS
        }
        Ok(reply) => {
            println!("{}", hex_dump(&reply));
            if let Some(code) = acknowledgement(&reply) {
                println!("Confirmation: {} ({})", code.name(), code);
            }
            ExitCode::SUCCESS
        }
        Err(code) => {
            eprintln!("Read failed: {}", code);
            ExitCode::FAILURE
        }
    }
}

/// Parse hex digits, ignoring whitespace and `0x` prefixes.
fn parse_hex(input: &str) -> Result<Vec<u8>, String> {
    let digits: String = input
        .split_whitespace()
        .map(|chunk| chunk.trim_start_matches("0x").trim_start_matches("0X"))
        .collect();

    if digits.is_empty() {
        return Err("No bytes given".to_string());
    }
    if digits.len() % 2 != 0 {
        return Err(format!("Odd number of hex digits in '{}'", input));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| format!("Invalid hex byte '{}'", &digits[i..i + 2]))
        })
        .collect()
}
