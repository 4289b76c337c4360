//! Byte order of multi-byte wire fields
//!
//! The FCU bus mixes both orders: some message groups carry big-endian words
//! while sibling messages use little-endian. The order is declared per field,
//! never inferred.

/// Byte order for 16/32-bit fields
///
/// For 16-bit value `0x1234`:
/// - `BigEndian`: [0x12, 0x34]
/// - `LittleEndian`: [0x34, 0x12]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Most significant byte first (Motorola)
    BigEndian,

    /// Least significant byte first (Intel)
    LittleEndian,
}
