use anyhow::Result;
use fevm_economics::{AccountAddress, TokenAmount};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewarderConfig {
    /// Only this account may register bounties
    pub owner: AccountAddress,
    /// Account holding deposited funds until they are paid out
    pub escrow_account: AccountAddress,
    /// Reward for a bounty registered without earmarked funds
    pub default_reward: TokenAmount,
}

impl Default for RewarderConfig {
    fn default() -> Self {
        Self {
            owner: AccountAddress::from_bytes([0u8; 20]),
            escrow_account: AccountAddress::from_bytes([0xEC; 20]),
            default_reward: TokenAmount::from_whole(1),
        }
    }
}

impl RewarderConfig {
    pub fn new(owner: AccountAddress, escrow_account: AccountAddress) -> Self {
        Self {
            owner,
            escrow_account,
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
}
