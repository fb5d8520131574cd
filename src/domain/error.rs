//! Domain error types

use thiserror::Error;

/// Errors that can occur while configuring or driving a serial port
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SerialError {
    /// Bad port name or port parameters
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Device busy, absent or access denied
    #[error("Failed to open {port}: {reason}")]
    Open { port: String, reason: String },

    /// OS-level failure while writing
    #[error("Write failed: {0}")]
    Write(String),

    /// OS-level failure on the receive path
    #[error("Read failed: {0}")]
    Read(String),

    /// Driver failure outside open/read/write, e.g. port enumeration
    #[error("Serial port error: {0}")]
    Serial(String),

    #[error("Serial port is not open")]
    NotOpen,

    #[error("Nothing to send: payload is empty")]
    EmptyPayload,

    /// Saving or loading a port profile failed
    #[error("Profile error: {0}")]
    Profile(String),
}

/// Result type alias for serial operations
pub type SerialResult<T> = Result<T, SerialError>;
