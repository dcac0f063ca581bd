//! # Voltage Modbus Serial Error Handling
//!
//! This module provides the error types of the serial transport core. Errors are
//! split along the point in time at which they can occur:
//!
//! ## Error Categories
//!
//! ### Decode Errors ([`FrameError`])
//! - **Length Errors**: captured RTU frame shorter than the envelope or longer
//!   than the buffer
//! - **Envelope Errors**: ASCII frame with an even byte count or missing markers
//! - **Checksum Errors**: CRC16 (RTU) or LRC8 (ASCII) disagreement
//!
//! Decode errors never tear the interface down. They are recorded as the
//! interface's last receive error and surfaced to whoever waits on the frame.
//!
//! ### Registry Errors ([`ModbusError`])
//! - **Configuration Errors**: slot already configured, role compiled out,
//!   invalid parameters, UART/GPIO not ready
//! - **Runtime Errors**: client timeout, transmitter busy, I/O on hosted ports
//!
//! ## Usage Example
//!
//! ```rust
//! use voltage_modbus_serial::{FrameError, ModbusError};
//!
//! fn describe(error: &ModbusError) {
//!     match error {
//!         ModbusError::Frame(FrameError::ChecksumMismatch { expected, actual }) => {
//!             println!("corrupted in transit: {:04X} != {:04X}", expected, actual);
//!         }
//!         ModbusError::Timeout { operation, timeout_ms } => {
//!             println!("{} timed out after {}ms", operation, timeout_ms);
//!         }
//!         other => println!("{}", other),
//!     }
//! }
//! ```

use thiserror::Error;

/// Result type alias for transport operations
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Decode-time frame errors
///
/// Produced by the frame codec when a captured byte run cannot be turned into a
/// [`LogicalFrame`](crate::protocol::LogicalFrame). The type is `Copy` so the
/// interface can record it as its last receive error without allocation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Captured RTU frame is shorter than address + function code + CRC
    #[error("Frame too short: {len} bytes (minimum {min})")]
    FrameTooShort { len: usize, min: usize },

    /// Captured frame exceeded the buffer capacity
    ///
    /// `len` counts every byte seen on the wire, including the ones that were
    /// drained and dropped once the buffer was full.
    #[error("Frame too long: {len} bytes (maximum {max})")]
    FrameTooLong { len: usize, max: usize },

    /// ASCII frame whose hex body has an odd number of characters
    #[error("ASCII frame has invalid length {len} (total byte count must be odd)")]
    OddLength { len: usize },

    /// ASCII frame without the `:` start marker or the CR LF end markers
    #[error("ASCII frame marker error")]
    FrameMarkerError,

    /// ASCII frame body contains a character that is not a hex digit
    #[error("Invalid ASCII hex character: 0x{byte:02X}")]
    InvalidHexDigit { byte: u8 },

    /// Structurally valid frame whose checksum does not match its content
    ///
    /// LRC8 values are stored widened to 16 bits.
    #[error("Checksum mismatch: expected={expected:04X}, actual={actual:04X}")]
    ChecksumMismatch { expected: u16, actual: u16 },
}

impl FrameError {
    /// Check if the frame was well formed but corrupted in transit
    pub fn is_checksum_error(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. })
    }
}

/// Transport core error types
///
/// Covers registry operations, configuration and client exchanges. Decode
/// failures are wrapped through [`ModbusError::Frame`] when they reach a client
/// caller.
#[derive(Error, Debug, Clone)]
pub enum ModbusError {
    /// The registry slot is already configured
    ///
    /// `configure` was called twice without an intervening `disable`.
    #[error("Interface {iface} is already configured")]
    AlreadyConfigured { iface: usize },

    /// The registry slot is not configured
    #[error("Interface {iface} is not configured")]
    NotConfigured { iface: usize },

    /// The interface index lies outside the registry table
    #[error("Interface {iface} does not exist (registry holds {capacity} slots)")]
    InvalidInterface { iface: usize, capacity: usize },

    /// The requested role was compiled out of this build
    #[error("Role {role} is not supported by this build")]
    RoleUnsupported { role: &'static str },

    /// UART or GPIO line failed its readiness check
    ///
    /// # Examples
    /// - UART device not initialised by the platform
    /// - DE line controller missing
    #[error("Line not ready: {message}")]
    LineNotReady { message: String },

    /// A transmission is already in progress or a frame is pending decode
    #[error("Interface {iface} is busy")]
    Busy { iface: usize },

    /// Client wait for a response exceeded its bound
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Received frame failed to decode
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// Invalid data value, e.g. a payload that does not fit the buffer
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Invalid interface configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// I/O errors on hosted serial ports
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Internal errors (should not occur in normal operation)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ModbusError {
    /// Create a new line-not-ready error
    pub fn line_not_ready<S: Into<String>>(message: S) -> Self {
        Self::LineNotReady { message: message.into() }
    }

    /// Create a new timeout error
    ///
    /// # Arguments
    ///
    /// * `operation` - Description of the operation that timed out
    /// * `timeout_ms` - Timeout duration in milliseconds
    pub fn timeout<S: Into<String>>(operation: S, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create an invalid data error
    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        Self::InvalidData { message: message.into() }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Check if the error is recoverable (can retry)
    ///
    /// Timeouts, busy transmitters and corrupted frames are transient on a
    /// noisy bus; configuration problems are not.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use voltage_modbus_serial::{FrameError, ModbusError};
    ///
    /// assert!(ModbusError::timeout("client wait", 500).is_recoverable());
    /// assert!(ModbusError::from(FrameError::FrameMarkerError).is_recoverable());
    /// assert!(!ModbusError::AlreadyConfigured { iface: 0 }.is_recoverable());
    /// ```
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Busy { .. } | Self::Frame(_) | Self::Io { .. }
        )
    }

    /// Check if the error originates from frame decoding
    pub fn is_frame_error(&self) -> bool {
        matches!(self, Self::Frame(_))
    }

    /// Check if the error was raised by the interface registry
    pub fn is_registry_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyConfigured { .. }
                | Self::NotConfigured { .. }
                | Self::InvalidInterface { .. }
                | Self::RoleUnsupported { .. }
                | Self::LineNotReady { .. }
        )
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for ModbusError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

/// Convert from serial port errors
impl From<tokio_serial::Error> for ModbusError {
    fn from(err: tokio_serial::Error) -> Self {
        Self::line_not_ready(err.to_string())
    }
}

/// Convert from serde JSON errors
impl From<serde_json::Error> for ModbusError {
    fn from(err: serde_json::Error) -> Self {
        Self::configuration(format!("JSON error: {}", err))
    }
}

/// Convert from serde YAML errors
impl From<serde_yaml::Error> for ModbusError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::configuration(format!("YAML error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = ModbusError::timeout("client wait", 5000);
        assert!(err.is_recoverable());
        assert!(!err.is_registry_error());

        let err = ModbusError::AlreadyConfigured { iface: 1 };
        assert!(!err.is_recoverable());
        assert!(err.is_registry_error());

        let err: ModbusError = FrameError::OddLength { len: 10 }.into();
        assert!(err.is_frame_error());
    }

    #[test]
    fn test_error_display() {
        let err = FrameError::ChecksumMismatch { expected: 0x1234, actual: 0x5678 };
        let msg = format!("{}", ModbusError::from(err));
        assert!(msg.contains("Checksum mismatch"));
        assert!(msg.contains("1234"));
        assert!(msg.contains("5678"));
        assert!(err.is_checksum_error());
    }
}
