//! Scaled numeric field conversions with byte order support
//!
//! A wire field is an integer of fixed width at a fixed byte position. Its
//! physical value is `raw * scale + offset`. Encoding is the inverse, with the
//! raw value clamped to the integer range before rounding so out-of-range input
//! saturates instead of wrapping into neighbouring bytes.

use super::ByteOrder;

// ============================================================================
// Field Description
// ============================================================================

/// Integer representation of a wire field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
}

impl FieldType {
    /// Width in bytes
    pub const fn size(&self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 => 4,
        }
    }

    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32)
    }

    /// Smallest representable raw value
    pub fn min_raw(&self) -> f64 {
        match self {
            Self::U8 | Self::U16 | Self::U32 => 0.0,
            Self::I8 => f64::from(i8::MIN),
            Self::I16 => f64::from(i16::MIN),
            Self::I32 => f64::from(i32::MIN),
        }
    }

    /// Largest representable raw value
    pub fn max_raw(&self) -> f64 {
        match self {
            Self::U8 => f64::from(u8::MAX),
            Self::I8 => f64::from(i8::MAX),
            Self::U16 => f64::from(u16::MAX),
            Self::I16 => f64::from(i16::MAX),
            Self::U32 => f64::from(u32::MAX),
            Self::I32 => f64::from(i32::MAX),
        }
    }
}

/// Position, width, byte order and linear transform of one wire field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Offset of the first byte within the payload
    pub byte: usize,
    pub kind: FieldType,
    pub order: ByteOrder,
    pub scale: f64,
    pub offset: f64,
}

impl FieldSpec {
    pub const fn new(byte: usize, kind: FieldType, order: ByteOrder) -> Self {
        Self {
            byte,
            kind,
            order,
            scale: 1.0,
            offset: 0.0,
        }
    }

    pub const fn u8(byte: usize) -> Self {
        Self::new(byte, FieldType::U8, ByteOrder::LittleEndian)
    }

    pub const fn u16_le(byte: usize) -> Self {
        Self::new(byte, FieldType::U16, ByteOrder::LittleEndian)
    }

    pub const fn u16_be(byte: usize) -> Self {
        Self::new(byte, FieldType::U16, ByteOrder::BigEndian)
    }

    pub const fn i16_le(byte: usize) -> Self {
        Self::new(byte, FieldType::I16, ByteOrder::LittleEndian)
    }

    pub const fn i16_be(byte: usize) -> Self {
        Self::new(byte, FieldType::I16, ByteOrder::BigEndian)
    }

    /// Attach a linear transform (`raw * scale + offset`)
    pub const fn scaled(self, scale: f64, offset: f64) -> Self {
        Self {
            scale,
            offset,
            ..self
        }
    }

    /// One past the last byte this field occupies
    pub const fn end(&self) -> usize {
        self.byte + self.kind.size()
    }
}

// ============================================================================
// Raw Byte Conversions
// ============================================================================

/// Convert 2 bytes to u16 with specified byte order
pub fn bytes_to_u16(bytes: [u8; 2], order: ByteOrder) -> u16 {
    match order {
        ByteOrder::BigEndian => u16::from_be_bytes(bytes),
        ByteOrder::LittleEndian => u16::from_le_bytes(bytes),
    }
}

/// Convert 2 bytes to i16 with specified byte order
pub fn bytes_to_i16(bytes: [u8; 2], order: ByteOrder) -> i16 {
    bytes_to_u16(bytes, order) as i16
}

/// Convert 4 bytes to u32 with specified byte order
pub fn bytes_to_u32(bytes: [u8; 4], order: ByteOrder) -> u32 {
    match order {
        ByteOrder::BigEndian => u32::from_be_bytes(bytes),
        ByteOrder::LittleEndian => u32::from_le_bytes(bytes),
    }
}

/// Convert u16 to 2 bytes with specified byte order
pub fn u16_to_bytes(value: u16, order: ByteOrder) -> [u8; 2] {
    match order {
        ByteOrder::BigEndian => value.to_be_bytes(),
        ByteOrder::LittleEndian => value.to_le_bytes(),
    }
}

/// Convert u32 to 4 bytes with specified byte order
pub fn u32_to_bytes(value: u32, order: ByteOrder) -> [u8; 4] {
    match order {
        ByteOrder::BigEndian => value.to_be_bytes(),
        ByteOrder::LittleEndian => value.to_le_bytes(),
    }
}

fn read_raw(bytes: &[u8], kind: FieldType, order: ByteOrder) -> Option<f64> {
    let raw = match kind {
        FieldType::U8 => f64::from(*bytes.first()?),
        FieldType::I8 => f64::from(*bytes.first()? as i8),
        FieldType::U16 => f64::from(bytes_to_u16(bytes.try_into().ok()?, order)),
        FieldType::I16 => f64::from(bytes_to_i16(bytes.try_into().ok()?, order)),
        FieldType::U32 => f64::from(bytes_to_u32(bytes.try_into().ok()?, order)),
        FieldType::I32 => f64::from(bytes_to_u32(bytes.try_into().ok()?, order) as i32),
    };
    Some(raw)
}

// ============================================================================
// Scaled Field Conversions
// ============================================================================

/// Read the raw integer of a field, without the linear transform
///
/// Returns `None` when the payload is too short to contain the field.
pub fn decode_raw(data: &[u8], spec: &FieldSpec) -> Option<f64> {
    let bytes = data.get(spec.byte..spec.end())?;
    read_raw(bytes, spec.kind, spec.order)
}

/// Decode a field to its physical value (`raw * scale + offset`)
///
/// Returns `None` when the payload is too short to contain the field.
pub fn decode_field(data: &[u8], spec: &FieldSpec) -> Option<f64> {
    decode_raw(data, spec).map(|raw| raw * spec.scale + spec.offset)
}

/// Convert a physical value to the clamped, rounded raw integer of a field
///
/// NaN encodes as zero.
pub fn physical_to_raw(value: f64, spec: &FieldSpec) -> f64 {
    let raw = (value - spec.offset) / spec.scale;
    if raw.is_nan() {
        return 0.0;
    }
    // Clamp first: rounding an out-of-range value must not wrap
    raw.clamp(spec.kind.min_raw(), spec.kind.max_raw()).round()
}

/// Encode a physical value into its field within `buf`
///
/// Fields that do not fit in `buf` are left unwritten.
pub fn encode_field(buf: &mut [u8], spec: &FieldSpec, value: f64) {
    let raw = physical_to_raw(value, spec);
    let Some(target) = buf.get_mut(spec.byte..spec.end()) else {
        return;
    };

    match spec.kind {
        FieldType::U8 => target[0] = raw as u8,
        FieldType::I8 => target[0] = (raw as i8) as u8,
        FieldType::U16 => target.copy_from_slice(&u16_to_bytes(raw as u16, spec.order)),
        FieldType::I16 => {
            target.copy_from_slice(&u16_to_bytes((raw as i16) as u16, spec.order))
        },
        FieldType::U32 => target.copy_from_slice(&u32_to_bytes(raw as u32, spec.order)),
        FieldType::I32 => {
            target.copy_from_slice(&u32_to_bytes((raw as i32) as u32, spec.order))
        },
    }
}
