//! Protocol Error Types
//!
//! Decoders and the command encoder never fail: short frames are dropped and
//! out-of-range setpoints are clamped. The errors here cover the edges where
//! untrusted input enters the crate.

use thiserror::Error;

/// Result type for fcu-protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Protocol codec errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    /// Payload does not fit in a classic CAN frame
    #[error("Payload too long: {len} bytes (max {max})")]
    PayloadTooLong { len: usize, max: usize },

    /// Identifier outside the 29-bit extended range
    #[error("Invalid CAN identifier: 0x{0:X}")]
    InvalidIdentifier(u32),

    /// Operator command could not be interpreted
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Snapshot could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Unknown protocol table name
    #[error("Unknown protocol version: {0}")]
    UnknownVersion(String),
}

impl ProtocolError {
    /// Create an invalid command error
    pub fn invalid_command(msg: impl Into<String>) -> Self {
        Self::InvalidCommand(msg.into())
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Serialization(err.to_string())
    }
}
