//! Wire byte decoding of sensor status codes.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use sensor_link::ErrorCode;

fn named(byte: u8) -> Option<ErrorCode> {
    ErrorCode::ALL.iter().copied().find(|code| code.to_byte() == byte)
}

proptest! {
    #[test]
    fn decode_matches_table(byte in any::<u8>()) {
        let decoded = ErrorCode::from_byte(byte);
        match named(byte) {
            Some(code) => prop_assert_eq!(decoded, code),
            None => prop_assert_eq!(decoded, ErrorCode::UnknownError),
        }
    }

    #[test]
    fn decoded_codes_encode_to_a_named_byte(byte in any::<u8>()) {
        let code = ErrorCode::from(byte);
        prop_assert_eq!(named(u8::from(code)), Some(code));
    }
}

#[test]
fn test_reserved_bytes_are_unknown() {
    let reserved = [0x14, 0x16, 0x17, 0x1C, 0x1E, 0x22, 0x28, 0x2A, 0x80, 0xFD];
    for byte in reserved {
        assert_eq!(ErrorCode::from_byte(byte), ErrorCode::UnknownError, "byte {byte:#04x}");
    }
}

#[test]
fn test_transport_codes() {
    assert_eq!(ErrorCode::from_byte(0x1D), ErrorCode::PortError);
    assert_eq!(ErrorCode::from_byte(0xFF), ErrorCode::Timeout);
    assert_eq!(ErrorCode::from_byte(0xFE), ErrorCode::BadPacket);
    assert_eq!(ErrorCode::from_byte(0x0E), ErrorCode::DeviceBusy);
    assert_eq!(ErrorCode::PortError.name(), "port_error");
    assert_eq!(
        ErrorCode::Timeout.to_string(),
        ErrorCode::Timeout.message().to_string()
    );
}

#[test]
fn test_codes_work_as_std_errors() {
    fn fails() -> Result<(), Box<dyn std::error::Error>> {
        Err(ErrorCode::PortError)?;
        Ok(())
    }
    let err = fails().unwrap_err();
    assert_eq!(err.to_string(), ErrorCode::PortError.message());
}
