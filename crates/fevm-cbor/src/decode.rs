//! CBOR decoder for the supported subset.
//!
//! Decoding never returns a partially built value: any malformed header,
//! short read or unsupported construct aborts with
//! [`CborError::InvalidEncoding`].

use crate::error::{CborError, Result};
use crate::value::Value;
use crate::{
    MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE, MAJOR_SIMPLE, MAJOR_TAG, MAJOR_TEXT,
    MAJOR_UNSIGNED, SIMPLE_FALSE, SIMPLE_NULL, SIMPLE_TRUE, SIMPLE_UNDEFINED, TAG_NEGATIVE_BIGNUM,
    TAG_POSITIVE_BIGNUM,
};
use num_bigint::{BigInt, BigUint};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Limits applied while decoding untrusted input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Maximum nesting of arrays, maps and tags
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

/// Decode exactly one item; trailing bytes are an error.
pub fn decode(data: &[u8]) -> Result<Value> {
    decode_with(data, DecodeOptions::default())
}

pub fn decode_with(data: &[u8], options: DecodeOptions) -> Result<Value> {
    let (value, consumed) = decode_first_with(data, options)?;
    if consumed != data.len() {
        return Err(CborError::invalid(
            consumed,
            format!("{} trailing bytes", data.len() - consumed),
        ));
    }
    Ok(value)
}

/// Decode the first item and report how many bytes it occupied.
pub fn decode_first(data: &[u8]) -> Result<(Value, usize)> {
    decode_first_with(data, DecodeOptions::default())
}

pub fn decode_first_with(data: &[u8], options: DecodeOptions) -> Result<(Value, usize)> {
    let mut decoder = Decoder {
        data,
        pos: 0,
        options,
    };
    let value = decoder.read_value(0)?;
    Ok((value, decoder.pos))
}

struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    options: DecodeOptions,
}

impl<'a> Decoder<'a> {
    fn read_value(&mut self, depth: usize) -> Result<Value> {
        if depth > self.options.max_depth {
            return Err(CborError::invalid(self.pos, "nesting too deep"));
        }

        let start = self.pos;
        let initial = self.take_byte()?;
        let major = initial >> 5;
        let info = initial & 0x1F;

        if major == MAJOR_SIMPLE {
            return match info {
                SIMPLE_FALSE => Ok(Value::Bool(false)),
                SIMPLE_TRUE => Ok(Value::Bool(true)),
                SIMPLE_NULL => Ok(Value::Null),
                SIMPLE_UNDEFINED => Ok(Value::Undefined),
                _ => Err(CborError::invalid(
                    start,
                    format!("unsupported simple value 0x{initial:02x}"),
                )),
            };
        }

        let arg = self.read_argument(start, info)?;

        match major {
            MAJOR_UNSIGNED => Ok(Value::Unsigned(arg)),
            MAJOR_NEGATIVE => Ok(negative_from_argument(arg)),
            MAJOR_BYTES => Ok(Value::Bytes(self.take_slice(arg)?.to_vec())),
            MAJOR_TEXT => {
                let bytes = self.take_slice(arg)?;
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| CborError::invalid(start, format!("invalid UTF-8: {e}")))?;
                Ok(Value::Text(text.to_string()))
            }
            MAJOR_ARRAY => {
                let len = self.bounded_count(start, arg, 1)?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.read_value(depth + 1)?);
                }
                Ok(Value::Array(items))
            }
            MAJOR_MAP => {
                let len = self.bounded_count(start, arg, 2)?;
                let mut entries = Vec::with_capacity(len);
                let mut seen = HashSet::with_capacity(len);
                for _ in 0..len {
                    let key_offset = self.pos;
                    let key = match self.read_value(depth + 1)? {
                        Value::Text(key) => key,
                        other => {
                            return Err(CborError::invalid(
                                key_offset,
                                format!("map key must be text, found {}", other.type_name()),
                            ))
                        }
                    };
                    if !seen.insert(key.clone()) {
                        return Err(CborError::invalid(
                            key_offset,
                            format!("duplicate map key {key:?}"),
                        ));
                    }
                    let value = self.read_value(depth + 1)?;
                    entries.push((key, value));
                }
                Ok(Value::Map(entries))
            }
            MAJOR_TAG => self.read_bignum(start, arg, depth),
            _ => unreachable!("major type is three bits"),
        }
    }

    fn read_bignum(&mut self, start: usize, tag: u64, depth: usize) -> Result<Value> {
        if tag != TAG_POSITIVE_BIGNUM && tag != TAG_NEGATIVE_BIGNUM {
            return Err(CborError::invalid(start, format!("unsupported tag {tag}")));
        }

        let payload_offset = self.pos;
        let payload = match self.read_value(depth + 1)? {
            Value::Bytes(bytes) => bytes,
            other => {
                return Err(CborError::invalid(
                    payload_offset,
                    format!("bignum payload must be bytes, found {}", other.type_name()),
                ))
            }
        };

        let magnitude = BigUint::from_bytes_be(&payload);
        if tag == TAG_POSITIVE_BIGNUM {
            Ok(Value::from_biguint(magnitude))
        } else {
            Ok(Value::from_bigint(-BigInt::from(magnitude) - 1u8))
        }
    }

    fn read_argument(&mut self, start: usize, info: u8) -> Result<u64> {
        let width = match info {
            0..=23 => return Ok(info as u64),
            24 => 1,
            25 => 2,
            26 => 4,
            27 => 8,
            31 => return Err(CborError::invalid(start, "indefinite length not supported")),
            _ => {
                return Err(CborError::invalid(
                    start,
                    format!("reserved additional info {info}"),
                ))
            }
        };

        let bytes = self.take_slice(width)?;
        Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64))
    }

    /// Reject counts that cannot possibly fit in the remaining input so a
    /// hostile header cannot force a huge allocation.
    fn bounded_count(&self, start: usize, count: u64, min_item_size: u64) -> Result<usize> {
        let remaining = (self.data.len() - self.pos) as u64;
        match count.checked_mul(min_item_size) {
            Some(needed) if needed <= remaining => Ok(count as usize),
            _ => Err(CborError::invalid(
                start,
                format!("declared {count} items but only {remaining} bytes remain"),
            )),
        }
    }

    fn take_byte(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| CborError::invalid(self.pos, "unexpected end of input"))?;
        self.pos += 1;
        Ok(byte)
    }

    fn take_slice(&mut self, len: u64) -> Result<&'a [u8]> {
        let remaining = self.data.len() - self.pos;
        if len > remaining as u64 {
            return Err(CborError::invalid(
                self.pos,
                format!("length {len} exceeds remaining {remaining} bytes"),
            ));
        }
        let len = len as usize;
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }
}

fn negative_from_argument(arg: u64) -> Value {
    if arg <= i64::MAX as u64 {
        Value::Signed(-1 - arg as i64)
    } else {
        Value::BigSigned(-BigInt::from(arg) - 1u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode;

    fn from_hex(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    #[test]
    fn test_decode_native_integers() {
        assert_eq!(decode(&from_hex("1818")).unwrap(), Value::Unsigned(24));
        assert_eq!(decode(&from_hex("3829")).unwrap(), Value::Signed(-42));
        assert!(matches!(
            decode(&from_hex("3bffffffffffffffff")).unwrap(),
            Value::BigSigned(_)
        ));
    }

    #[test]
    fn test_small_bignum_decodes_native() {
        // tag 2 wrapping the single byte 0x05
        assert!(matches!(decode(&from_hex("c24105")).unwrap(), Value::Unsigned(5)));
    }

    #[test]
    fn test_reserved_info_rejected() {
        for header in ["1c", "1d", "1e", "5f", "9f", "bf", "f8", "f9", "fa", "fb", "ff"] {
            let err = decode(&from_hex(header)).unwrap_err();
            assert!(
                matches!(err, CborError::InvalidEncoding { .. }),
                "header {header} should be rejected"
            );
        }
    }

    #[test]
    fn test_truncated_inputs() {
        assert!(decode(&[]).is_err());
        // uint16 header with one byte of argument
        assert!(decode(&from_hex("1901")).is_err());
        // byte string claiming 5 bytes with 2 present
        assert!(decode(&from_hex("450102")).is_err());
        // array of 3 with 2 items
        assert!(decode(&from_hex("830102")).is_err());
    }

    #[test]
    fn test_duplicate_and_non_text_keys() {
        // {"a": 1, "a": 2}
        assert!(decode(&from_hex("a2616101616102")).is_err());
        // {1: 2}
        assert!(decode(&from_hex("a10102")).is_err());
    }

    #[test]
    fn test_unsupported_tag() {
        // tag 42 (CID) is not part of the supported subset
        assert!(decode(&from_hex("d82a4100")).is_err());
    }

    #[test]
    fn test_trailing_bytes() {
        assert!(decode(&from_hex("0000")).is_err());
        let (value, used) = decode_first(&from_hex("0000")).unwrap();
        assert_eq!(value, Value::Unsigned(0));
        assert_eq!(used, 1);
    }

    #[test]
    fn test_depth_limit() {
        let mut nested = Value::Null;
        for _ in 0..10 {
            nested = Value::Array(vec![nested]);
        }
        let bytes = encode(&nested).unwrap();
        assert!(decode_with(&bytes, DecodeOptions { max_depth: 5 }).is_err());
        assert_eq!(decode(&bytes).unwrap(), nested);
    }

    #[test]
    fn test_huge_declared_length() {
        // array claiming 2^32 items
        assert!(decode(&from_hex("9affffffff")).is_err());
    }
}
