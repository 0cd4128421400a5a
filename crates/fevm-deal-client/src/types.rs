use crate::error::{DealClientError, Result};
use fevm_economics::{AccountAddress, TokenAmount};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Binary form of a piece content identifier. Never empty.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PieceCid(Vec<u8>);

impl PieceCid {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(DealClientError::InvalidIdentifier(
                "piece cid must not be empty".to_string(),
            ));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))
            .map_err(|e| DealClientError::InvalidIdentifier(e.to_string()))?;
        Self::new(bytes)
    }
}

impl fmt::Debug for PieceCid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "PieceCid({}...)", &hex[..hex.len().min(12)])
    }
}

impl fmt::Display for PieceCid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl Serialize for PieceCid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PieceCid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// blake3 digest of a proposal's canonical encoding
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProposalId([u8; 32]);

impl ProposalId {
    pub fn from_encoding(encoded: &[u8]) -> Self {
        Self(blake3::hash(encoded).into())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProposalId({}...)", &self.to_hex()[..8])
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Storage provider actor address, kept in its opaque binary form
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderAddress(Vec<u8>);

impl ProviderAddress {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ProviderAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProviderAddress(0x{})", hex::encode(&self.0))
    }
}

impl fmt::Display for ProviderAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

/// Deal status as reported by the market actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealStatus {
    /// Submitted to the market actor, no acknowledgement yet
    Proposed,
    /// Included in a publish message
    Published,
    /// Sealed by the provider; deal id is bound
    Activated,
    Terminated,
}

impl DealStatus {
    pub fn code(&self) -> u64 {
        match self {
            DealStatus::Proposed => 1,
            DealStatus::Published => 2,
            DealStatus::Activated => 3,
            DealStatus::Terminated => 4,
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(DealStatus::Proposed),
            2 => Some(DealStatus::Published),
            3 => Some(DealStatus::Activated),
            4 => Some(DealStatus::Terminated),
            _ => None,
        }
    }

    /// Check if a transition to `next` is allowed
    pub fn can_transition_to(&self, next: &Self) -> bool {
        use DealStatus::*;
        match (self, next) {
            (Proposed, Published) => true,
            // Synchronous actors may skip straight to activation
            (Proposed, Activated) => true,

            (Published, Activated) => true,
            (Published, Terminated) => true,

            (Activated, Terminated) => true,

            (Terminated, _) => false,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DealStatus::Terminated)
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Version 1 extra parameters: where providers fetch the data from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraParamsV1 {
    pub location_ref: String,
    pub car_size: u64,
    pub skip_ipni_announce: bool,
    pub remove_unsealed_copy: bool,
}

/// Storage deal terms submitted by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealProposal {
    pub piece_cid: PieceCid,
    /// Padded piece size in bytes
    pub piece_size: u64,
    pub verified_deal: bool,
    pub label: String,
    pub start_epoch: i64,
    pub end_epoch: i64,
    pub storage_price_per_epoch: TokenAmount,
    pub provider_collateral: TokenAmount,
    pub client_collateral: TokenAmount,
    pub extra_params_version: u64,
    pub extra_params: ExtraParamsV1,
}

/// Per-piece registry record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealRecord {
    /// Account that proposed the piece
    pub client: AccountAddress,
    /// Providers that reported on the piece, in first-seen order
    pub providers: Vec<ProviderAddress>,
    /// Proposals submitted for the piece, in submission order
    pub proposal_ids: Vec<ProposalId>,
    pub deal_id: Option<u64>,
    pub status: DealStatus,
}

impl DealRecord {
    pub fn new(client: AccountAddress) -> Self {
        Self {
            client,
            providers: Vec::new(),
            proposal_ids: Vec::new(),
            deal_id: None,
            status: DealStatus::Proposed,
        }
    }

    /// Transition to a new status, enforcing `DealStatus::can_transition_to()`.
    pub fn transition_to(&mut self, new_status: DealStatus) -> Result<()> {
        if !self.status.can_transition_to(&new_status) {
            return Err(DealClientError::InvalidStateTransition {
                from: self.status.to_string(),
                to: new_status.to_string(),
            });
        }

        tracing::debug!(
            deal_id = ?self.deal_id,
            from = %self.status,
            to = %new_status,
            "Deal state transition"
        );

        self.status = new_status;
        Ok(())
    }

    pub fn add_provider(&mut self, provider: ProviderAddress) {
        if !self.providers.contains(&provider) {
            self.providers.push(provider);
        }
    }

    pub fn latest_proposal(&self) -> Option<&ProposalId> {
        self.proposal_ids.last()
    }
}

/// Entry in the ordered list of activated deals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealEntry {
    pub deal_id: u64,
    pub piece_cid: PieceCid,
    /// Size from the proposal that was activated
    pub piece_size: u64,
    pub provider: Option<ProviderAddress>,
}

/// Data commitment of an activated deal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealCommitment {
    pub data: Vec<u8>,
    pub size: u64,
}

/// Deal facts exposed to other ledger components
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealInfo {
    pub deal_id: u64,
    pub piece_cid: PieceCid,
    /// Account that proposed the piece; bounty payouts go here
    pub client: AccountAddress,
    pub piece_size: u64,
    pub status: DealStatus,
    pub provider: Option<ProviderAddress>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_piece_cid_rejected() {
        let err = PieceCid::new(Vec::new()).unwrap_err();
        assert_eq!(err.code(), "invalid_identifier");
        assert!(PieceCid::from_hex("0x").is_err());
        assert!(PieceCid::from_hex("0x0181e203").is_ok());
    }

    #[test]
    fn test_status_codes() {
        for status in [
            DealStatus::Proposed,
            DealStatus::Published,
            DealStatus::Activated,
            DealStatus::Terminated,
        ] {
            assert_eq!(DealStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(DealStatus::from_code(0), None);
        assert_eq!(DealStatus::from_code(5), None);
    }

    #[test]
    fn test_status_transitions() {
        use DealStatus::*;

        assert!(Proposed.can_transition_to(&Published));
        assert!(Proposed.can_transition_to(&Activated));
        assert!(Published.can_transition_to(&Activated));
        assert!(Published.can_transition_to(&Terminated));
        assert!(Activated.can_transition_to(&Terminated));

        assert!(!Proposed.can_transition_to(&Terminated));
        assert!(!Published.can_transition_to(&Published));
        assert!(!Activated.can_transition_to(&Published));
        assert!(!Terminated.can_transition_to(&Activated));
        assert!(!Terminated.can_transition_to(&Proposed));
    }

    #[test]
    fn test_record_transition_rejected_leaves_status() {
        let mut record = DealRecord::new(AccountAddress::from_bytes([1u8; 20]));
        assert!(record.transition_to(DealStatus::Terminated).is_err());
        assert_eq!(record.status, DealStatus::Proposed);

        record.transition_to(DealStatus::Published).unwrap();
        record.transition_to(DealStatus::Activated).unwrap();
        assert_eq!(record.status, DealStatus::Activated);
    }

    #[test]
    fn test_proposal_id_deterministic() {
        let a = ProposalId::from_encoding(b"terms");
        let b = ProposalId::from_encoding(b"terms");
        assert_eq!(a, b);
        assert_ne!(a, ProposalId::from_encoding(b"other terms"));
        assert_eq!(a.to_hex().len(), 64);
    }
}
