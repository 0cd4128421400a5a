//! Registry events, streamed to subscribers created with `DealClient::with_events`

use crate::types::{DealStatus, PieceCid, ProposalId, ProviderAddress};
use chrono::{DateTime, Utc};
use fevm_economics::AccountAddress;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DealEvent {
    ProposalCreated {
        proposal_id: ProposalId,
        piece_cid: PieceCid,
        client: AccountAddress,
        piece_size: u64,
        verified_deal: bool,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    DealPublished {
        piece_cid: PieceCid,
        deal_id: Option<u64>,
        provider: Option<ProviderAddress>,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    DealActivated {
        piece_cid: PieceCid,
        deal_id: u64,
        provider: Option<ProviderAddress>,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },

    DealTerminated {
        piece_cid: PieceCid,
        deal_id: Option<u64>,
        previous_status: DealStatus,
        #[serde(with = "chrono::serde::ts_seconds")]
        timestamp: DateTime<Utc>,
    },
}

impl DealEvent {
    pub fn piece_cid(&self) -> &PieceCid {
        match self {
            DealEvent::ProposalCreated { piece_cid, .. }
            | DealEvent::DealPublished { piece_cid, .. }
            | DealEvent::DealActivated { piece_cid, .. }
            | DealEvent::DealTerminated { piece_cid, .. } => piece_cid,
        }
    }
}
