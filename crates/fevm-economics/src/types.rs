use anyhow::{anyhow, bail, Result};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

pub const TOKEN_DECIMALS: u32 = 18;
pub const ATTO_PER_TOKEN: u64 = 1_000_000_000_000_000_000; // 10^18

/// Largest ledger-native amount: 2^256 - 1
fn max_amount() -> &'static BigUint {
    static MAX: OnceLock<BigUint> = OnceLock::new();
    MAX.get_or_init(|| (BigUint::one() << 256u32) - BigUint::one())
}

/// Token amount in atto units, bounded by the ledger's 256-bit word.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenAmount(BigUint);

impl TokenAmount {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn max_value() -> Self {
        Self(max_amount().clone())
    }

    pub fn from_atto(atto: u128) -> Self {
        Self(BigUint::from(atto))
    }

    pub fn from_whole(tokens: u64) -> Self {
        Self(BigUint::from(tokens) * BigUint::from(ATTO_PER_TOKEN))
    }

    /// Wrap an arbitrary magnitude, rejecting values wider than 256 bits.
    pub fn try_from_biguint(value: BigUint) -> Result<Self> {
        if &value > max_amount() {
            bail!("Amount exceeds 256-bit range: {}", value);
        }
        Ok(Self(value))
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        let sum = &self.0 + &other.0;
        (&sum <= max_amount()).then_some(Self(sum))
    }

    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        (self.0 >= other.0).then(|| Self(&self.0 - &other.0))
    }

    pub fn saturating_sub(&self, other: &Self) -> Self {
        self.checked_sub(other).unwrap_or_default()
    }

    pub fn to_be_bytes(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} attoFIL", self.0)
    }
}

impl FromStr for TokenAmount {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = BigUint::from_str(s.trim()).map_err(|e| anyhow!("Invalid amount {s:?}: {e}"))?;
        Self::try_from_biguint(value)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 20-byte ledger account address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountAddress([u8; 20]);

impl AccountAddress {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| anyhow!("Address must be 20 bytes, got {}", bytes.len()))?;
        Ok(Self(arr))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)?;
        Self::from_slice(&bytes)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for AccountAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
