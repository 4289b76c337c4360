//! CAN frame type shared by the decoders, the encoder and the transport

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};

/// Maximum payload of a classic CAN frame
pub const MAX_PAYLOAD_LEN: usize = 8;

/// Largest 29-bit extended identifier
pub const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;

/// One CAN bus message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanFrame {
    pub id: u32,
    pub data: Vec<u8>,
    /// Receive time in milliseconds since the Unix epoch (0 for outbound frames)
    #[serde(default)]
    pub timestamp_ms: i64,
    #[serde(default = "default_extended")]
    pub is_extended: bool,
}

fn default_extended() -> bool {
    true
}

impl CanFrame {
    /// Build an extended frame, rejecting payloads longer than 8 bytes
    pub fn new(id: u32, data: impl Into<Vec<u8>>) -> Result<Self> {
        let data = data.into();
        if data.len() > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLong {
                len: data.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }
        if id > MAX_EXTENDED_ID {
            return Err(ProtocolError::InvalidIdentifier(id));
        }
        Ok(Self {
            id,
            data,
            timestamp_ms: 0,
            is_extended: true,
        })
    }

    /// Outbound frame from a full 8-byte payload (infallible)
    pub(crate) fn from_payload(id: u32, payload: [u8; MAX_PAYLOAD_LEN]) -> Self {
        Self {
            id,
            data: payload.to_vec(),
            timestamp_ms: 0,
            is_extended: true,
        }
    }

    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Display for CanFrame {
    /// candump compact form: `18FF01F0#0102`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:08X}#", self.id)?;
        for byte in &self.data {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_up_to_eight_bytes() {
        let frame = CanFrame::new(0x18FF01F0, vec![1, 2]).unwrap();
        assert_eq!(frame.len(), 2);
        assert!(frame.is_extended);
        assert!(CanFrame::new(0x18FF01F0, [0u8; 8]).is_ok());
        assert!(CanFrame::new(0x18FF01F0, Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_new_rejects_oversized() {
        let err = CanFrame::new(0x18FF01F0, vec![0u8; 9]).unwrap_err();
        assert_eq!(err, ProtocolError::PayloadTooLong { len: 9, max: 8 });
        assert!(CanFrame::new(0x2000_0000, vec![]).is_err());
    }

    #[test]
    fn test_display_candump() {
        let frame = CanFrame::new(0x18FF01F0, vec![0x05, 0xA2]).unwrap();
        assert_eq!(frame.to_string(), "18FF01F0#05A2");
    }
}
