use fevm_deal_client::{DealClientError, DealStatus};
use thiserror::Error;

/// Bounty ledger error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewarderError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Bounty was paid out before
    #[error("Bounty already claimed: {0}")]
    AlreadyClaimed(String),

    #[error("Deal {deal_id} is not activated (status {status})")]
    NotActivated { deal_id: u64, status: DealStatus },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Activated deal stores a different amount of data than the bounty asks for
    #[error("Piece size mismatch: bounty expects {expected}, deal has {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: String, available: String },

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Deal registry lookup failed for a reason other than a missing deal
    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Economics error: {0}")]
    Economics(String),
}

impl RewarderError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Forbidden(_) => "forbidden",
            Self::AlreadyExists(_) => "already_exists",
            Self::AlreadyClaimed(_) => "already_claimed",
            Self::NotActivated { .. } => "not_activated",
            Self::NotFound(_) => "not_found",
            Self::SizeMismatch { .. } => "size_mismatch",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::InvalidIdentifier(_) => "invalid_identifier",
            Self::Registry(_) => "registry",
            Self::Economics(_) => "economics",
        }
    }
}

impl From<DealClientError> for RewarderError {
    fn from(err: DealClientError) -> Self {
        match err {
            DealClientError::NotFound(what) => Self::NotFound(what),
            DealClientError::InvalidIdentifier(what) => Self::InvalidIdentifier(what),
            other => Self::Registry(other.to_string()),
        }
    }
}

/// Result type for bounty ledger operations
pub type Result<T> = std::result::Result<T, RewarderError>;
