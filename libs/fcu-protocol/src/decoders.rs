//! Per-identifier frame decoders
//!
//! Each decoder is a plain function keyed by one CAN identifier. It checks the
//! payload length, reads every field it owns, and only then writes them into
//! the state, so a short or malformed payload produces no mutation at all.
//! A decoder never touches fields documented for another message.
//!
//! Field layouts are published as [`FieldSpec`](crate::FieldSpec) constants so
//! byte order, scale and offset are declared data, not code branches.

pub mod extended;
pub mod legacy;

use crate::bytes::{decode_field, FieldSpec};
use crate::state::MachineState;

/// Decoder signature: `Some(())` when the payload was applied
pub type DecodeFn = fn(&[u8], &mut MachineState) -> Option<()>;

/// Read a field, failing when the payload is shorter than the field
#[inline]
pub(crate) fn field(data: &[u8], spec: &FieldSpec) -> Option<f64> {
    decode_field(data, spec)
}

/// Reject payloads shorter than `min_len`
#[inline]
pub(crate) fn require(data: &[u8], min_len: usize) -> Option<()> {
    (data.len() >= min_len).then_some(())
}
