use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CborError {
    /// Input is not a valid encoding of a supported value
    #[error("Invalid CBOR at offset {offset}: {reason}")]
    InvalidEncoding { offset: usize, reason: String },

    #[error("Duplicate map key: {0}")]
    DuplicateKey(String),

    #[error("Unexpected type: expected {expected}, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },
}

impl CborError {
    pub(crate) fn invalid(offset: usize, reason: impl Into<String>) -> Self {
        Self::InvalidEncoding {
            offset,
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Buffer capacity overflow: requested {0} bytes")]
    CapacityOverflow(usize),
}

pub type Result<T> = std::result::Result<T, CborError>;
