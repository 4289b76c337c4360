//! Decoder registry and single-frame dispatch
//!
//! Two closed tables exist for the same physical bus. Exactly one is active
//! per session, selected by [`ProtocolVersion`]. A firmware revision adds a
//! new table; existing entries are never edited.

use crate::decoders::{extended, legacy, DecodeFn};
use crate::error::ProtocolError;
use crate::frame::CanFrame;
use crate::state::MachineState;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::trace;

/// Active message table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    /// 4 little-endian telemetry frames, single control frame
    Legacy,
    /// 8 mixed-endian telemetry frames, 3-frame control batch
    #[default]
    Extended,
}

impl ProtocolVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Extended => "extended",
        }
    }

    /// Static decoder entries of this table
    pub fn decoders(&self) -> &'static [MessageDecoder] {
        match self {
            Self::Legacy => LEGACY_DECODERS,
            Self::Extended => EXTENDED_DECODERS,
        }
    }
}

impl FromStr for ProtocolVersion {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" | "v1" => Ok(Self::Legacy),
            "extended" | "v2" => Ok(Self::Extended),
            other => Err(ProtocolError::UnknownVersion(other.to_string())),
        }
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One table entry: identifier, minimum payload length and decoder
#[derive(Debug, Clone, Copy)]
pub struct MessageDecoder {
    pub id: u32,
    pub name: &'static str,
    pub min_len: usize,
    pub decode: DecodeFn,
}

const fn entry(id: u32, name: &'static str, min_len: usize, decode: DecodeFn) -> MessageDecoder {
    MessageDecoder {
        id,
        name,
        min_len,
        decode,
    }
}

pub static LEGACY_DECODERS: &[MessageDecoder] = &[
    entry(legacy::STATUS_ID, "status", legacy::STATUS_LEN, legacy::decode_status),
    entry(legacy::POWER_ID, "power", legacy::POWER_LEN, legacy::decode_power),
    entry(legacy::SENSORS_ID, "sensors", legacy::SENSORS_LEN, legacy::decode_sensors),
    entry(legacy::IO_ID, "io", legacy::IO_LEN, legacy::decode_io),
];

pub static EXTENDED_DECODERS: &[MessageDecoder] = &[
    entry(
        extended::STACK_STATUS_ID,
        "stack_status",
        extended::FRAME_LEN,
        extended::decode_stack_status,
    ),
    entry(extended::DCDC_ID, "dcdc", extended::FRAME_LEN, extended::decode_dcdc),
    entry(
        extended::H2_PRESSURE_ID,
        "h2_pressure",
        extended::FRAME_LEN,
        extended::decode_h2_pressure,
    ),
    entry(extended::H2_LOOP_ID, "h2_loop", extended::FRAME_LEN, extended::decode_h2_loop),
    entry(extended::AIR_ID, "air", extended::FRAME_LEN, extended::decode_air),
    entry(
        extended::COMPRESSOR_ID,
        "compressor",
        extended::FRAME_LEN,
        extended::decode_compressor,
    ),
    entry(
        extended::ACTUATOR_ID,
        "actuators",
        extended::FRAME_LEN,
        extended::decode_actuators,
    ),
    entry(extended::FAULT_ID, "faults", extended::FRAME_LEN, extended::decode_faults),
];

/// Result of dispatching one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Decoder applied; connectivity and timestamp updated
    Decoded { name: &'static str },
    /// Known identifier, payload too short; state untouched
    Truncated {
        name: &'static str,
        required: usize,
        actual: usize,
    },
    /// No decoder for this identifier; state untouched
    Unknown,
}

impl DispatchOutcome {
    pub fn is_decoded(&self) -> bool {
        matches!(self, Self::Decoded { .. })
    }
}

/// Identifier → decoder lookup for one protocol version
#[derive(Debug, Clone)]
pub struct ProtocolTable {
    version: ProtocolVersion,
    decoders: FxHashMap<u32, &'static MessageDecoder>,
}

impl ProtocolTable {
    pub fn new(version: ProtocolVersion) -> Self {
        let decoders = version
            .decoders()
            .iter()
            .map(|decoder| (decoder.id, decoder))
            .collect();
        Self { version, decoders }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn lookup(&self, id: u32) -> Option<&'static MessageDecoder> {
        self.decoders.get(&id).copied()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.decoders.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Route one frame to its decoder
    ///
    /// On success sets `connected` and `last_update = now_ms`. Truncated and
    /// unknown frames leave the state unchanged. The same payload dispatched
    /// twice yields the same field values.
    pub fn dispatch(
        &self,
        state: &mut MachineState,
        frame: &CanFrame,
        now_ms: i64,
    ) -> DispatchOutcome {
        let Some(decoder) = self.lookup(frame.id) else {
            return DispatchOutcome::Unknown;
        };

        let truncated = DispatchOutcome::Truncated {
            name: decoder.name,
            required: decoder.min_len,
            actual: frame.data.len(),
        };
        if frame.data.len() < decoder.min_len {
            return truncated;
        }

        match (decoder.decode)(&frame.data, state) {
            Some(()) => {
                state.mark_received(now_ms);
                trace!("Decoded {} (0x{:08X}): {}", decoder.name, frame.id, frame);
                DispatchOutcome::Decoded { name: decoder.name }
            },
            None => truncated,
        }
    }
}
