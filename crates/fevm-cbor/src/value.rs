use crate::error::{CborError, Result};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::ToPrimitive;

/// A decoded or to-be-encoded CBOR item.
///
/// Integer variants compare by numeric value, so `Unsigned(5)`,
/// `Signed(5)` and `BigUnsigned(5)` are equal. Maps compare as key/value
/// sets; emission order is kept for encoding but ignored by `==`.
#[derive(Debug, Clone)]
pub enum Value {
    Unsigned(u64),
    Signed(i64),
    /// Magnitude wider than 64 bits, encoded with tag 2
    BigUnsigned(BigUint),
    /// Value outside the native range, encoded with tag 2 or tag 3
    BigSigned(BigInt),
    Bool(bool),
    Null,
    Undefined,
    Text(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Build the smallest integer variant that represents `n`.
    pub fn from_bigint(n: BigInt) -> Self {
        if let Some(v) = n.to_u64() {
            Value::Unsigned(v)
        } else if let Some(v) = n.to_i64() {
            Value::Signed(v)
        } else if n.sign() == Sign::Minus {
            Value::BigSigned(n)
        } else {
            Value::BigUnsigned(n.magnitude().clone())
        }
    }

    pub fn from_biguint(n: BigUint) -> Self {
        match n.to_u64() {
            Some(v) => Value::Unsigned(v),
            None => Value::BigUnsigned(n),
        }
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unsigned(_) | Value::Signed(_) => "integer",
            Value::BigUnsigned(_) | Value::BigSigned(_) => "big integer",
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::Undefined => "undefined",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Value::Unsigned(_) | Value::Signed(_) | Value::BigUnsigned(_) | Value::BigSigned(_)
        )
    }

    /// Null and undefined both mark an absent field.
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }

    pub fn to_bigint(&self) -> Option<BigInt> {
        match self {
            Value::Unsigned(v) => Some(BigInt::from(*v)),
            Value::Signed(v) => Some(BigInt::from(*v)),
            Value::BigUnsigned(v) => Some(BigInt::from(v.clone())),
            Value::BigSigned(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Result<u64> {
        self.to_bigint()
            .ok_or_else(|| self.mismatch("unsigned integer"))?
            .to_u64()
            .ok_or_else(|| self.mismatch("unsigned integer"))
    }

    pub fn as_i64(&self) -> Result<i64> {
        self.to_bigint()
            .ok_or_else(|| self.mismatch("signed integer"))?
            .to_i64()
            .ok_or_else(|| self.mismatch("signed integer"))
    }

    pub fn as_biguint(&self) -> Result<BigUint> {
        let n = self.to_bigint().ok_or_else(|| self.mismatch("unsigned integer"))?;
        n.to_biguint().ok_or_else(|| self.mismatch("unsigned integer"))
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(self.mismatch("bool")),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Text(s) => Ok(s),
            _ => Err(self.mismatch("text")),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Value::Bytes(b) => Ok(b),
            _ => Err(self.mismatch("bytes")),
        }
    }

    pub fn as_array(&self) -> Result<&[Value]> {
        match self {
            Value::Array(items) => Ok(items),
            _ => Err(self.mismatch("array")),
        }
    }

    pub fn as_map(&self) -> Result<&[(String, Value)]> {
        match self {
            Value::Map(entries) => Ok(entries),
            _ => Err(self.mismatch("map")),
        }
    }

    /// Look up a map entry by key. Returns `None` for non-maps.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    fn mismatch(&self, expected: &'static str) -> CborError {
        CborError::UnexpectedType {
            expected,
            found: self.type_name(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if self.is_integer() && other.is_integer() {
            return self.to_bigint() == other.to_bigint();
        }

        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Undefined, Value::Undefined) => true,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len() && map_contains(a, b) && map_contains(b, a)
            }
            _ => false,
        }
    }
}

/// Every entry of `a` appears somewhere in `b`
fn map_contains(a: &[(String, Value)], b: &[(String, Value)]) -> bool {
    a.iter().all(|(key, value)| {
        b.iter()
            .any(|(other_key, other_value)| key == other_key && value == other_value)
    })
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Unsigned(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        if v >= 0 {
            Value::Unsigned(v as u64)
        } else {
            Value::Signed(v)
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<BigUint> for Value {
    fn from(v: BigUint) -> Self {
        Value::from_biguint(v)
    }
}

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Self {
        Value::from_bigint(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
