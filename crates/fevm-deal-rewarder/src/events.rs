use chrono::{DateTime, Utc};
use fevm_deal_client::PieceCid;
use fevm_economics::{AccountAddress, TokenAmount};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RewarderEvent {
    Funded {
        from: AccountAddress,
        amount: TokenAmount,
        piece_cid: Option<PieceCid>,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    BountyAdded {
        piece_cid: PieceCid,
        piece_size: u64,
        reward: TokenAmount,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    BountyClaimed {
        piece_cid: PieceCid,
        deal_id: u64,
        recipient: AccountAddress,
        amount: TokenAmount,
        tx_hash: String,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },
}
