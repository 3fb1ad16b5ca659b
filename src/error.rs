//! Error types for the ECI client
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using EciError
pub type Result<T> = std::result::Result<T, EciError>;

/// Unified error type for ECI operations
#[derive(Debug, Error)]
pub enum EciError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Not connected")]
    NotConnected,

    /// A send or receive moved fewer bytes than required.
    /// The stream position is undefined afterwards.
    #[error("Partial {operation}: expected {expected} bytes, transferred {actual}")]
    PartialIo {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Unexpected response tag: 0x{0:02x}")]
    UnexpectedResponse(u8),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Device Errors
    // -------------------------------------------------------------------------
    #[error("Device rejected command with error code {0}")]
    Device(i16),

    // -------------------------------------------------------------------------
    // Argument Errors
    // -------------------------------------------------------------------------
    #[error("Event code must be exactly 4 bytes, got {0}")]
    InvalidEventCode(usize),

    #[error("Byte order spec must be exactly 4 bytes, got {0}")]
    InvalidByteOrder(usize),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EciError {
    /// Whether the byte stream can no longer be trusted after this error.
    ///
    /// The protocol has no resynchronization point, so partial I/O or an
    /// unknown tag leaves the session unusable until reconnected.
    pub fn is_desync(&self) -> bool {
        matches!(
            self,
            EciError::Io(_)
                | EciError::PartialIo { .. }
                | EciError::UnexpectedResponse(_)
                | EciError::Protocol(_)
        )
    }

    /// Vendor error code carried by a Failure response, if any
    pub fn device_code(&self) -> Option<i16> {
        match self {
            EciError::Device(code) => Some(*code),
            _ => None,
        }
    }
}
