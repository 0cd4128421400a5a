//! CBOR encoder.
//!
//! Only definite-length items are produced. Every header uses the shortest
//! argument width that fits, so equal values always encode to equal bytes.

use crate::buffer::ByteBuffer;
use crate::error::{CborError, Result};
use crate::value::Value;
use crate::{
    MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE, MAJOR_SIMPLE, MAJOR_TAG, MAJOR_TEXT,
    MAJOR_UNSIGNED, SIMPLE_FALSE, SIMPLE_NULL, SIMPLE_TRUE, SIMPLE_UNDEFINED, TAG_NEGATIVE_BIGNUM,
    TAG_POSITIVE_BIGNUM,
};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, ToPrimitive};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct Encoder {
    buf: ByteBuffer,
}

impl Encoder {
    pub fn new() -> Self {
        Self {
            buf: ByteBuffer::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: ByteBuffer::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.into_bytes()
    }

    pub fn write_uint64(&mut self, value: u64) {
        self.write_header(MAJOR_UNSIGNED, value);
    }

    pub fn write_int64(&mut self, value: i64) {
        if value >= 0 {
            self.write_header(MAJOR_UNSIGNED, value as u64);
        } else {
            // -1 - value never overflows for negative i64
            self.write_header(MAJOR_NEGATIVE, (-1 - value) as u64);
        }
    }

    /// Write an unsigned integer of any width, falling back to a tag 2
    /// bignum above `u64::MAX`.
    pub fn write_uint256(&mut self, value: &BigUint) {
        match value.to_u64() {
            Some(v) => self.write_uint64(v),
            None => {
                self.write_header(MAJOR_TAG, TAG_POSITIVE_BIGNUM);
                self.write_bytes(&value.to_bytes_be());
            }
        }
    }

    /// Write a signed integer of any width. Values below `-2^64` use a
    /// tag 3 bignum carrying `-1 - value`.
    pub fn write_int256(&mut self, value: &BigInt) {
        match value.sign() {
            Sign::Minus => {
                let encoded = value.magnitude() - BigUint::one();
                match encoded.to_u64() {
                    Some(v) => self.write_header(MAJOR_NEGATIVE, v),
                    None => {
                        self.write_header(MAJOR_TAG, TAG_NEGATIVE_BIGNUM);
                        self.write_bytes(&encoded.to_bytes_be());
                    }
                }
            }
            _ => self.write_uint256(value.magnitude()),
        }
    }

    pub fn write_bytes(&mut self, value: &[u8]) {
        self.write_header(MAJOR_BYTES, value.len() as u64);
        self.buf.append(value);
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_header(MAJOR_TEXT, value.len() as u64);
        self.buf.append(value.as_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_simple(if value { SIMPLE_TRUE } else { SIMPLE_FALSE });
    }

    pub fn write_null(&mut self) {
        self.write_simple(SIMPLE_NULL);
    }

    pub fn write_undefined(&mut self) {
        self.write_simple(SIMPLE_UNDEFINED);
    }

    /// Begin an array of exactly `len` items; the caller writes them next.
    pub fn start_fixed_array(&mut self, len: u64) {
        self.write_header(MAJOR_ARRAY, len);
    }

    /// Begin a map of exactly `len` pairs; the caller writes key, value, ...
    pub fn start_fixed_map(&mut self, len: u64) {
        self.write_header(MAJOR_MAP, len);
    }

    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Unsigned(v) => self.write_uint64(*v),
            Value::Signed(v) => self.write_int64(*v),
            Value::BigUnsigned(v) => self.write_uint256(v),
            Value::BigSigned(v) => self.write_int256(v),
            Value::Bool(v) => self.write_bool(*v),
            Value::Null => self.write_null(),
            Value::Undefined => self.write_undefined(),
            Value::Text(v) => self.write_string(v),
            Value::Bytes(v) => self.write_bytes(v),
            Value::Array(items) => {
                self.start_fixed_array(items.len() as u64);
                for item in items {
                    self.write_value(item)?;
                }
            }
            Value::Map(entries) => {
                let mut seen = HashSet::with_capacity(entries.len());
                for (key, _) in entries {
                    if !seen.insert(key.as_str()) {
                        return Err(CborError::DuplicateKey(key.clone()));
                    }
                }

                self.start_fixed_map(entries.len() as u64);
                for (key, item) in entries {
                    self.write_string(key);
                    self.write_value(item)?;
                }
            }
        }
        Ok(())
    }

    fn write_header(&mut self, major: u8, value: u64) {
        let major = major << 5;
        if value <= 23 {
            self.buf.append_u8(major | value as u8);
        } else if value <= 0xFF {
            self.buf.append_u8(major | 24);
            self.buf.append_int(value, 1);
        } else if value <= 0xFFFF {
            self.buf.append_u8(major | 25);
            self.buf.append_int(value, 2);
        } else if value <= 0xFFFF_FFFF {
            self.buf.append_u8(major | 26);
            self.buf.append_int(value, 4);
        } else {
            self.buf.append_u8(major | 27);
            self.buf.append_int(value, 8);
        }
    }

    fn write_simple(&mut self, simple: u8) {
        self.buf.append_u8((MAJOR_SIMPLE << 5) | simple);
    }
}

/// Encode a complete value.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new();
    encoder.write_value(value)?;
    Ok(encoder.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_of(value: &Value) -> String {
        hex::encode(encode(value).unwrap())
    }

    #[test]
    fn test_small_integers() {
        assert_eq!(hex_of(&Value::Unsigned(0)), "00");
        assert_eq!(hex_of(&Value::Unsigned(23)), "17");
        assert_eq!(hex_of(&Value::Unsigned(24)), "1818");
        assert_eq!(hex_of(&Value::Unsigned(0x100)), "190100");
        assert_eq!(hex_of(&Value::Unsigned(0x10000)), "1a00010000");
        assert_eq!(hex_of(&Value::Unsigned(0x1_0000_0000)), "1b0000000100000000");
        assert_eq!(hex_of(&Value::Signed(-1)), "20");
        assert_eq!(hex_of(&Value::Signed(-42)), "3829");
        assert_eq!(hex_of(&Value::Signed(i64::MIN)), "3b7fffffffffffffff");
    }

    #[test]
    fn test_simple_values() {
        assert_eq!(hex_of(&Value::Bool(false)), "f4");
        assert_eq!(hex_of(&Value::Bool(true)), "f5");
        assert_eq!(hex_of(&Value::Null), "f6");
        assert_eq!(hex_of(&Value::Undefined), "f7");
    }

    #[test]
    fn test_strings() {
        assert_eq!(hex_of(&Value::from("a")), "6161");
        assert_eq!(hex_of(&Value::Bytes(b"Test".to_vec())), "4454657374");
        let long = "This string is longer than 24 characters.";
        assert!(hex_of(&Value::from(long)).starts_with("7829"));
    }

    #[test]
    fn test_bignum_headers() {
        let wide = BigUint::from(u64::MAX) + 1u8;
        assert_eq!(
            hex_of(&Value::BigUnsigned(wide)),
            "c249010000000000000000"
        );

        // -2^64 still fits the native negative form
        let min_native = -(BigInt::from(u64::MAX) + 1u8);
        assert_eq!(hex_of(&Value::BigSigned(min_native.clone())), "3bffffffffffffffff");

        let below = min_native - 1u8;
        assert_eq!(hex_of(&Value::BigSigned(below)), "c349010000000000000000");
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let value = Value::map([("k", Value::Null), ("k", Value::Bool(true))]);
        assert_eq!(encode(&value), Err(CborError::DuplicateKey("k".to_string())));
    }

    #[test]
    fn test_map_keeps_insertion_order() {
        let value = Value::map([("b", Value::from(1u64)), ("a", Value::from(2u64))]);
        assert_eq!(hex_of(&value), "a2616201616102");
    }
}
