//! # Error Types
//!
//! Custom error types for UMB Poller using `thiserror`.
//!
//! Frame-level errors reject a whole response; channel errors belong to one
//! record and sit next to successfully decoded records.

use thiserror::Error;

/// Frame-level rejection of a response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("This packet is empty")]
    EmptyFrame,

    #[error("The packet cannot be resolved: missing SOH/EOT framing")]
    UnframedPacket,

    #[error("Wrong length: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Wrong CRC: calculated 0x{expected:04X}, received 0x{actual:04X}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("Response address does not echo the request (to 0x{to:04X}, from 0x{from:04X})")]
    AddressMismatch { to: u16, from: u16 },

    #[error("Device status 0x{code:02X}: {description}")]
    DeviceStatus { code: u8, description: String },

    #[error("Unknown command 0x{cmd:02X} version 0x{verc:02X}")]
    UnknownCommand { cmd: u8, verc: u8 },

    #[error("Wrong channel count: requested {expected}, response declares {actual}")]
    ChannelCountMismatch { expected: usize, actual: usize },
}

/// Error attached to a single channel record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("Channel {channel:?} status 0x{code:02X}: {description}")]
    DeviceStatus {
        channel: Option<u16>,
        code: u8,
        description: String,
    },

    #[error("Wrong record length: {needed} bytes needed, {available} available")]
    LengthMismatch { needed: usize, available: usize },

    #[error("Channel {channel}: unknown data type 0x{type_tag:02X}")]
    UnknownChannelType { channel: u16, type_tag: u8 },

    #[error("Wrong channel: requested {expected}, got {actual}")]
    ChannelMismatch { expected: u16, actual: u16 },

    #[error("Channel {channel}: no record in response")]
    Missing { channel: u16 },
}

/// Unrecognised `Type` byte in a value decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown channel data type 0x{0:02X}")]
pub struct UnknownChannelType(pub u8);

/// Main error type for UMB Poller
#[derive(Debug, Error)]
pub enum UmbPollerError {
    /// UMB protocol errors
    #[error("UMB protocol error: {0}")]
    Protocol(#[from] FrameError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading serialisation errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// No complete frame arrived in time
    #[error("No response within {0} ms")]
    Timeout(u64),
}

/// Result type alias for UMB Poller
pub type Result<T> = std::result::Result<T, UmbPollerError>;
