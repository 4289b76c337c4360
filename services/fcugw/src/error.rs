//! Error handling for the FCU gateway

use fcu_protocol::ProtocolError;
use thiserror::Error;

/// Gateway error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// CAN transport errors (open, send, receive)
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Transport used before `open` or after `close`
    #[error("Transport not open")]
    NotOpen,

    /// Codec errors surfaced from the protocol library
    #[error("Protocol error: {0}")]
    ProtocolError(#[from] ProtocolError),

    /// Input/Output operation errors
    #[error("IO error: {0}")]
    IoError(String),
}

/// Result type alias for the gateway
pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::TransportError(msg.into())
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::IoError(err.to_string())
    }
}

impl From<figment::Error> for GatewayError {
    fn from(err: figment::Error) -> Self {
        GatewayError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_converts() {
        let err: GatewayError = ProtocolError::UnknownVersion("v9".into()).into();
        assert_eq!(err.to_string(), "Protocol error: Unknown protocol version: v9");
    }

    #[test]
    fn test_io_error_converts() {
        let err: GatewayError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, GatewayError::IoError(ref msg) if msg == "gone"));
    }
}
