use anyhow::Result;
use fevm_cbor::DecodeOptions;
use fevm_economics::AccountAddress;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Storage market actor (f05) in its 20-byte masked-id form
pub const MARKET_ACTOR_ADDRESS: [u8; 20] = [
    0xff, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x05,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealClientConfig {
    /// Only this account may submit proposals
    pub owner: AccountAddress,
    /// Only this caller may deliver actor callbacks
    pub system_actor: AccountAddress,
    /// Maximum label length in bytes
    pub max_label_len: usize,
    #[serde(default)]
    pub decode: DecodeOptions,
}

impl Default for DealClientConfig {
    fn default() -> Self {
        Self {
            owner: AccountAddress::from_bytes([0u8; 20]),
            system_actor: AccountAddress::from_bytes(MARKET_ACTOR_ADDRESS),
            max_label_len: 256,
            decode: DecodeOptions::default(),
        }
    }
}

impl DealClientConfig {
    pub fn with_owner(owner: AccountAddress) -> Self {
        Self {
            owner,
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
