//! Binary field processing utilities
//!
//! Byte order handling, bit-flag extraction/injection, and scaled numeric
//! field conversions for FCU frames.
//!
//! These helpers carry no knowledge of message semantics; the decoders and
//! the command encoder describe every field as a [`FieldSpec`] and let this
//! module do the arithmetic.

pub mod bit_ops;
pub mod byte_order;
pub mod conversions;

pub use bit_ops::*;
pub use byte_order::ByteOrder;
pub use conversions::*;
