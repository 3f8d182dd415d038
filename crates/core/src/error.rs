//! Error types for mmwave-core

use std::path::PathBuf;
use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Serial(String),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Display control failed: {0}")]
    Display(String),

    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CoreError>;

/// Report payload could not be turned into a `ReportFrame`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Payload too short: {len} bytes (need {need})")]
    Truncated { len: usize, need: usize },

    #[error("Invalid data header: 0x{0:02X}")]
    InvalidDataHeader(u8),

    #[error("Unknown data type: 0x{0:02X}")]
    UnknownDataType(u8),

    #[error("Unknown target status: 0x{0:02X}")]
    UnknownTargetStatus(u8),
}

/// No usable serial device was found
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("No serial hardware found (probed: {})", display_paths(.probed))]
    NoSerialHardware { probed: Vec<PathBuf> },

    #[error(
        "UART appears disabled: add `enable_uart=1` to {} and reboot",
        .boot_config.display()
    )]
    UartDisabled { boot_config: PathBuf },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<serialport::Error> for CoreError {
    fn from(err: serialport::Error) -> Self {
        CoreError::Serial(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::ChannelClosed;
        assert_eq!(err.to_string(), "Channel closed");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let core_err: CoreError = io_err.into();
        assert!(matches!(core_err, CoreError::Io(_)));
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::InvalidDataHeader(0x55);
        assert_eq!(err.to_string(), "Invalid data header: 0x55");

        let err: CoreError = DecodeError::UnknownDataType(0x07).into();
        assert_eq!(err.to_string(), "Decode error: Unknown data type: 0x07");
    }

    #[test]
    fn test_discovery_error_lists_probed_paths() {
        let err = DiscoveryError::NoSerialHardware {
            probed: vec![PathBuf::from("/dev/ttyAMA0"), PathBuf::from("/dev/ttyS0")],
        };
        assert_eq!(
            err.to_string(),
            "No serial hardware found (probed: /dev/ttyAMA0, /dev/ttyS0)"
        );
    }

    #[test]
    fn test_uart_disabled_hint() {
        let err = DiscoveryError::UartDisabled {
            boot_config: PathBuf::from("/boot/config.txt"),
        };
        assert!(err.to_string().contains("enable_uart=1"));
        assert!(err.to_string().contains("/boot/config.txt"));
    }
}
