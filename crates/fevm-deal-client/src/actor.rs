//! Low-level call interface to the storage market system actor

use async_trait::async_trait;
use thiserror::Error;

/// Publish a batch of storage deals
pub const PUBLISH_STORAGE_DEALS_METHOD: u64 = 4;
/// Market actor asks the client to authenticate a proposal it is publishing
pub const AUTHENTICATE_MESSAGE_METHOD: u64 = 2643134072;
/// Market actor reports a deal status change
pub const MARKET_NOTIFY_DEAL_METHOD: u64 = 4186741094;

/// Multicodec code for CBOR-encoded call parameters
pub const CBOR_CODEC: u64 = 0x51;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActorCallError {
    /// The actor executed the call and returned a non-zero exit code
    #[error("actor exited with code {exit_code}: {message}")]
    Rejected { exit_code: i32, message: String },

    #[error("actor unavailable: {0}")]
    Unavailable(String),
}

/// Privileged system actor reachable through the fixed call interface.
///
/// `call` returns the raw response payload, if any. A response carries a
/// `DealNotification` when the actor acknowledges synchronously.
#[async_trait]
pub trait SystemActorClient: Send + Sync {
    async fn call(
        &self,
        method: u64,
        params: &[u8],
    ) -> std::result::Result<Option<Vec<u8>>, ActorCallError>;
}
