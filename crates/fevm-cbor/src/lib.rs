//! # FEVM CBOR
//!
//! The compact binary interchange format spoken by the storage market
//! actor: a definite-length subset of CBOR (RFC 8949).
//!
//! ## Supported items
//!
//! - Unsigned and negative integers, with tag 2 / tag 3 bignums for
//!   magnitudes wider than 64 bits
//! - Booleans, `null` and `undefined`
//! - UTF-8 text and byte strings
//! - Definite-length arrays and text-keyed maps
//!
//! Indefinite-length items, floats and other tags are rejected.

pub mod buffer;
pub mod decode;
pub mod encode;
pub mod error;
pub mod value;

pub use buffer::ByteBuffer;
pub use decode::{decode, decode_first, decode_first_with, decode_with, DecodeOptions};
pub use encode::{encode, Encoder};
pub use error::{BufferError, CborError, Result};
pub use value::Value;

pub const MAJOR_UNSIGNED: u8 = 0;
pub const MAJOR_NEGATIVE: u8 = 1;
pub const MAJOR_BYTES: u8 = 2;
pub const MAJOR_TEXT: u8 = 3;
pub const MAJOR_ARRAY: u8 = 4;
pub const MAJOR_MAP: u8 = 5;
pub const MAJOR_TAG: u8 = 6;
pub const MAJOR_SIMPLE: u8 = 7;

pub const TAG_POSITIVE_BIGNUM: u64 = 2;
pub const TAG_NEGATIVE_BIGNUM: u64 = 3;

pub const SIMPLE_FALSE: u8 = 20;
pub const SIMPLE_TRUE: u8 = 21;
pub const SIMPLE_NULL: u8 = 22;
pub const SIMPLE_UNDEFINED: u8 = 23;
