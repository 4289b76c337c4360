//! Bit-level operations for packed flag and mode bytes
//!
//! Bit 0 is the least significant bit of a byte. Multi-byte ranges use
//! LSB-first ordering, so bit 8 is bit 0 of the second byte.

/// Extract single bit from u8 value
#[inline]
pub fn extract_bit_u8(value: u8, bit_index: u8) -> bool {
    debug_assert!(bit_index < 8, "Bit index out of range: {}", bit_index);
    (value & (1 << bit_index)) != 0
}

/// OR a flag into an accumulator byte when `on` is set
///
/// Never clears bits already present in `acc`.
#[inline]
pub fn inject_flag(acc: u8, bit_index: u8, on: bool) -> u8 {
    debug_assert!(bit_index < 8, "Bit index out of range: {}", bit_index);
    if on {
        acc | (1 << bit_index)
    } else {
        acc
    }
}

/// Extract a sub-byte field (`width` bits starting at `shift`) from a byte
#[inline]
pub fn extract_field_u8(value: u8, shift: u8, width: u8) -> u8 {
    debug_assert!(shift + width <= 8, "Field exceeds byte: {}+{}", shift, width);
    let mask = ((1u16 << width) - 1) as u8;
    (value >> shift) & mask
}

/// Insert bits into byte array (LSB-first)
///
/// Only the low `bit_length` bits of `value` are written; higher bits are
/// discarded so they cannot spill into the neighbouring field.
pub fn insert_bits(bytes: &mut [u8], start_bit: u16, bit_length: u8, value: u64) {
    debug_assert!(bit_length <= 64, "Bit length out of range: {}", bit_length);
    debug_assert!(bit_length > 0, "Bit length must be greater than 0");

    for i in 0..bit_length {
        let position = start_bit + u16::from(i);
        let Some(byte) = bytes.get_mut(usize::from(position / 8)) else {
            break;
        };
        let mask = 1u8 << (position % 8);
        if (value >> i) & 0x01 == 1 {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bit_u8() {
        let value = 0b1010_1100u8;
        assert!(!extract_bit_u8(value, 0));
        assert!(extract_bit_u8(value, 2));
        assert!(extract_bit_u8(value, 3));
        assert!(extract_bit_u8(value, 7));
    }

    #[test]
    fn test_inject_flag_accumulates() {
        let acc = inject_flag(0, 0, true);
        let acc = inject_flag(acc, 3, true);
        let acc = inject_flag(acc, 5, false);
        assert_eq!(acc, 0b0000_1001);
        // OR semantics: a false flag never clears
        assert_eq!(inject_flag(0xFF, 2, false), 0xFF);
    }

    #[test]
    fn test_extract_field_u8() {
        assert_eq!(extract_field_u8(0x08, 0, 2), 0);
        assert_eq!(extract_field_u8(0x08, 2, 6), 2);
        assert_eq!(extract_field_u8(0b1100_0000, 6, 2), 3);
        assert_eq!(extract_field_u8(0xFF, 0, 8), 0xFF);
    }

    #[test]
    fn test_insert_bits_masks_value() {
        let mut data = [0u8; 2];
        insert_bits(&mut data, 2, 3, 0b1111_1111);
        assert_eq!(data[0], 0b0001_1100);
        assert_eq!(data[1], 0);
    }

    #[test]
    fn test_insert_spans_bytes() {
        let mut data = [0xFFu8; 2];
        insert_bits(&mut data, 6, 4, 0b0101);
        assert_eq!(data[0], 0b0111_1111);
        assert_eq!(data[1], 0b1111_1101);
        // Past the end is ignored
        insert_bits(&mut data, 14, 8, 0);
        assert_eq!(data[1], 0b0011_1101);
    }
}
