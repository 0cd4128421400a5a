use crate::actor::ActorCallError;
use thiserror::Error;

/// Deal client error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DealClientError {
    /// Malformed wire payload
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Caller is not allowed to perform the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Empty or malformed piece identifier
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid epoch range: start {start} must precede end {end}")]
    InvalidEpochRange { start: i64, end: i64 },

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Invalid state transition: from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Unsupported method: {0}")]
    UnsupportedMethod(u64),

    /// The system actor rejected or failed the call
    #[error("System actor call failed: {0}")]
    ActorCall(#[from] ActorCallError),
}

impl DealClientError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidEncoding(_) => "invalid_encoding",
            Self::Forbidden(_) => "forbidden",
            Self::AlreadyExists(_) => "already_exists",
            Self::NotFound(_) => "not_found",
            Self::InvalidIdentifier(_) => "invalid_identifier",
            Self::InvalidEpochRange { .. } => "invalid_epoch_range",
            Self::InvalidProposal(_) => "invalid_proposal",
            Self::InvalidStateTransition { .. } => "invalid_state_transition",
            Self::UnsupportedMethod(_) => "unsupported_method",
            Self::ActorCall(_) => "actor_call",
        }
    }
}

impl From<fevm_cbor::CborError> for DealClientError {
    fn from(err: fevm_cbor::CborError) -> Self {
        Self::InvalidEncoding(err.to_string())
    }
}

/// Result type for deal client operations
pub type Result<T> = std::result::Result<T, DealClientError>;
