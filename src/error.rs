//! Sensor status codes and the transport result type.
//!
//! `ErrorCode` is the single-byte confirmation code used by the sensor
//! protocol. The transport maps its own failures onto the same table so
//! callers deal with exactly one error vocabulary.

use std::fmt;

/// Result of every fallible transport operation.
pub type TransportResult<T> = Result<T, ErrorCode>;

macro_rules! error_codes {
    ($( $(#[$meta:meta])* $variant:ident = $byte:literal, $name:literal, $message:literal; )+) => {
        /// Status and error codes shared with the sensor wire protocol.
        ///
        /// Discriminants are the wire bytes. Decoding is many-to-one: every
        /// byte without a named code, including the reserved 0x19, decodes
        /// to [`ErrorCode::UnknownError`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum ErrorCode {
            $( $(#[$meta])* $variant = $byte, )+
        }

        impl ErrorCode {
            /// Every named code, in wire order.
            pub const ALL: &'static [ErrorCode] = &[ $( ErrorCode::$variant, )+ ];

            /// The snake_case symbol for this code, e.g. `"port_error"`.
            pub const fn name(self) -> &'static str {
                match self {
                    $( ErrorCode::$variant => $name, )+
                }
            }

            /// Human-readable description of this code.
            pub const fn message(self) -> &'static str {
                match self {
                    $( ErrorCode::$variant => $message, )+
                }
            }
        }
    };
}

error_codes! {
    Success = 0x00, "success", "operation completed successfully";
    ConnectionRefused = 0x01, "connection_refused", "connection refused: sensor could not connect to host";
    FingerNotDetected = 0x02, "finger_not_detected", "no finger detected on sensor";
    CaptureFailed = 0x03, "capture_failed", "failed to capture fingerprint image";
    FingerTooDry = 0x04, "finger_too_dry", "image is too faint to extract features";
    FingerTooWet = 0x05, "finger_too_wet", "image is too blurry to extract features";
    FingerTooDirty = 0x06, "finger_too_dirty", "image is too distorted to extract features";
    InsufficientFeatures = 0x07, "insufficient_features", "image has too few features to generate template";
    NoMatchFound = 0x08, "no_match_found", "finger does not match";
    FingerNotFound = 0x09, "finger_not_found", "finger is not found in data store";
    EnrollmentMismatch = 0x0a, "enrollment_mismatch", "enrollment failed: mismatch during capture";
    IndexOutOfRange = 0x0b, "index_out_of_range", "index is out of range";
    StorageAccessFailure = 0x0c, "storage_access_failure", "failed to access or read database";
    TemplateUploadFailed = 0x0d, "template_upload_failed", "failed to upload template";
    /// The sensor (or the local dispatch queue) cannot accept new requests.
    DeviceBusy = 0x0e, "device_busy", "sensor is busy and cannot accept new requests";
    ImageUploadFailed = 0x0f, "image_upload_failed", "failed to upload fingerprint image";
    TemplateDeletionFailed = 0x10, "template_deletion_failed", "failed to delete template";
    DatabaseClearFailed = 0x11, "database_clear_failed", "failed to clear database";
    CannotEnterLowPower = 0x12, "cannot_enter_low_power", "unable to switch to low-power mode";
    BadPassword = 0x13, "bad_password", "password required before use";
    BadImageFormat = 0x15, "bad_image_format", "template generation failed: invalid image format";
    FlashError = 0x18, "flash_error", "flash write error";
    /// Decode fallback for any unrecognised byte.
    UnknownError = 0x19, "unknown_error", "unknown error";
    BadRegister = 0x1a, "bad_register", "invalid device register";
    BadDeviceConfiguration = 0x1b, "bad_device_configuration", "invalid device configuration";
    /// Device could not be opened, configured, or driven.
    PortError = 0x1d, "port_error", "port or serial communication error";
    NoSpaceLeft = 0x1f, "no_space_left", "enrollment failed: database full";
    BadAddress = 0x20, "bad_address", "invalid device address";
    DeviceLockOut = 0x21, "device_lock_out", "password verification required before use";
    HardwareError = 0x29, "hardware_error", "hardware malfunction detected";
    BadPacket = 0xfe, "bad_packet", "invalid or malformed packet sent";
    /// A bounded wait elapsed before the device became ready.
    Timeout = 0xff, "timeout", "operation timed out";
}

impl ErrorCode {
    /// Decode a wire byte.
    ///
    /// 0x19 and every byte without a named code map to `UnknownError`.
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Self::Success,
            0x01 => Self::ConnectionRefused,
            0x02 => Self::FingerNotDetected,
            0x03 => Self::CaptureFailed,
            0x04 => Self::FingerTooDry,
            0x05 => Self::FingerTooWet,
            0x06 => Self::FingerTooDirty,
            0x07 => Self::InsufficientFeatures,
            0x08 => Self::NoMatchFound,
            0x09 => Self::FingerNotFound,
            0x0a => Self::EnrollmentMismatch,
            0x0b => Self::IndexOutOfRange,
            0x0c => Self::StorageAccessFailure,
            0x0d => Self::TemplateUploadFailed,
            0x0e => Self::DeviceBusy,
            0x0f => Self::ImageUploadFailed,
            0x10 => Self::TemplateDeletionFailed,
            0x11 => Self::DatabaseClearFailed,
            0x12 => Self::CannotEnterLowPower,
            0x13 => Self::BadPassword,
            0x15 => Self::BadImageFormat,
            0x18 => Self::FlashError,
            0x1a => Self::BadRegister,
            0x1b => Self::BadDeviceConfiguration,
            0x1d => Self::PortError,
            0x1f => Self::NoSpaceLeft,
            0x20 => Self::BadAddress,
            0x21 => Self::DeviceLockOut,
            0x29 => Self::HardwareError,
            0xfe => Self::BadPacket,
            0xff => Self::Timeout,
            _ => Self::UnknownError,
        }
    }

    /// Encode as a wire byte.
    pub const fn to_byte(self) -> u8 {
        self as u8
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    pub const fn is_error(self) -> bool {
        !self.is_success()
    }

    /// Turn a decoded confirmation byte into a `Result`.
    pub fn into_result(self) -> TransportResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<u8> for ErrorCode {
    fn from(byte: u8) -> Self {
        Self::from_byte(byte)
    }
}

impl From<ErrorCode> for u8 {
    fn from(code: ErrorCode) -> Self {
        code.to_byte()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ErrorCode {}
