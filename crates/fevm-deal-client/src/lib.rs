//! # FEVM Deal Client
//!
//! On-ledger registry for storage deals proposed to the storage market
//! actor.
//!
//! ## Flow
//!
//! 1. The owner submits a [`DealProposal`] with [`DealClient::propose`]. The
//!    proposal is encoded, hashed into a [`ProposalId`] and forwarded to the
//!    actor with `PUBLISH_STORAGE_DEALS_METHOD`.
//! 2. The actor reports status changes as [`DealNotification`]s, either in
//!    the publish response or later through
//!    [`DealClient::handle_filecoin_method`].
//! 3. Activated deals are appended to an ordered deal list that other
//!    components read through [`DealRegistryView`].

pub mod actor;
pub mod config;
pub mod error;
pub mod events;
pub mod notification;
pub mod proposal;
pub mod registry;
pub mod testing;
pub mod types;

pub use actor::{
    ActorCallError, SystemActorClient, AUTHENTICATE_MESSAGE_METHOD, CBOR_CODEC,
    MARKET_NOTIFY_DEAL_METHOD, PUBLISH_STORAGE_DEALS_METHOD,
};
pub use config::{DealClientConfig, MARKET_ACTOR_ADDRESS};
pub use error::{DealClientError, Result};
pub use events::DealEvent;
pub use notification::DealNotification;
pub use proposal::EXTRA_PARAMS_VERSION_V1;
pub use registry::{DealClient, DealRegistryView};
pub use types::{
    DealCommitment, DealEntry, DealInfo, DealProposal, DealRecord, DealStatus, ExtraParamsV1,
    PieceCid, ProposalId, ProviderAddress,
};
