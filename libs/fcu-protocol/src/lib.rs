//! Fuel-cell Control Unit protocol library
//!
//! Codec and state-aggregation engine for the FCU CAN bus.
//!
//! # Architecture
//!
//! This library provides:
//! - **Bytes Utilities**: Byte order handling, bit operations, scaled field conversions
//! - **Frame Decoders**: One pure function per known identifier, grouped by protocol table
//! - **Machine State**: The aggregate the decoders mutate, with derived power/efficiency
//! - **Registry**: Identifier → decoder lookup and single-frame dispatch
//! - **Command Encoder**: Operator command → ordered batch of control frames
//! - **Snapshot Export**: Versioned, alias-mapped view for network clients and classifiers
//!
//! Nothing in this crate performs I/O. Every public operation completes synchronously.

pub mod bytes;
pub mod command;
pub mod decoders;
pub mod error;
pub mod frame;
pub mod registry;
pub mod shared;
pub mod snapshot;
pub mod state;
pub mod time;

// Re-export core types
pub use bytes::{ByteOrder, FieldSpec, FieldType};
pub use command::{encode_command, Command, ControlCommand, OperatingMode};
pub use error::{ProtocolError, Result};
pub use frame::{CanFrame, MAX_PAYLOAD_LEN};
pub use registry::{DispatchOutcome, MessageDecoder, ProtocolTable, ProtocolVersion};
pub use shared::SharedMachineState;
pub use snapshot::{FeatureVector, MachineSnapshot, SNAPSHOT_SCHEMA_VERSION};
pub use state::MachineState;
pub use time::{FixedTimeProvider, SystemTimeProvider, TimeProvider};
