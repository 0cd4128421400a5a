//! Deal proposal registry
//!
//! Tracks every piece the owner proposes, the proposals submitted for it and
//! the status the market actor reports back. Status changes arrive either
//! synchronously in the publish response or later through
//! `handle_filecoin_method`, which only the configured system actor may call.

use crate::actor::{
    SystemActorClient, AUTHENTICATE_MESSAGE_METHOD, CBOR_CODEC, MARKET_NOTIFY_DEAL_METHOD,
    PUBLISH_STORAGE_DEALS_METHOD,
};
use crate::config::DealClientConfig;
use crate::error::{DealClientError, Result};
use crate::events::DealEvent;
use crate::notification::DealNotification;
use crate::types::{
    DealCommitment, DealEntry, DealInfo, DealProposal, DealRecord, DealStatus, PieceCid,
    ProposalId, ProviderAddress,
};
use async_trait::async_trait;
use chrono::Utc;
use fevm_economics::AccountAddress;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

/// Read-only view of the registry for other ledger components
#[async_trait]
pub trait DealRegistryView: Send + Sync {
    /// Look up an activated deal. Unknown ids yield `NotFound`.
    async fn deal_by_id(&self, deal_id: u64) -> Result<DealInfo>;

    async fn piece_status(&self, piece_cid: &PieceCid) -> Result<DealStatus>;
}

struct StoredProposal {
    piece_cid: PieceCid,
    proposal: DealProposal,
    encoded: Vec<u8>,
}

#[derive(Default)]
struct RegistryState {
    records: HashMap<PieceCid, DealRecord>,
    proposals: HashMap<ProposalId, StoredProposal>,
    deals: Vec<DealEntry>,
    /// deal id -> position in `deals`
    deal_index: HashMap<u64, usize>,
    /// deal id -> piece it was bound to, from publication onwards
    deal_pieces: HashMap<u64, PieceCid>,
}

/// Outcome of a notification, computed against a copy of the record
struct StagedUpdate {
    record: DealRecord,
    activation: Option<DealEntry>,
    event: DealEvent,
}

impl RegistryState {
    fn stage_notification(
        &self,
        mut record: DealRecord,
        notification: &DealNotification,
    ) -> Result<StagedUpdate> {
        let cid = &notification.piece_cid;
        let previous_status = record.status;
        record.transition_to(notification.status)?;

        if let Some(provider) = &notification.provider {
            record.add_provider(provider.clone());
        }

        let now = Utc::now();
        let mut activation = None;
        let event = match notification.status {
            DealStatus::Published => {
                if let Some(deal_id) = notification.deal_id {
                    self.check_binding(&record, cid, deal_id)?;
                    record.deal_id = Some(deal_id);
                }
                DealEvent::DealPublished {
                    piece_cid: cid.clone(),
                    deal_id: notification.deal_id,
                    provider: notification.provider.clone(),
                    timestamp: now,
                }
            }
            DealStatus::Activated => {
                let deal_id = notification.deal_id.ok_or_else(|| {
                    DealClientError::InvalidEncoding(
                        "activation notification without a deal id".to_string(),
                    )
                })?;
                self.check_binding(&record, cid, deal_id)?;
                record.deal_id = Some(deal_id);

                // The newest proposal is the one the market activates
                let piece_size = record
                    .latest_proposal()
                    .and_then(|id| self.proposals.get(id))
                    .map(|stored| stored.proposal.piece_size)
                    .ok_or_else(|| {
                        DealClientError::NotFound(format!("no proposal recorded for piece {}", cid))
                    })?;

                let provider = notification
                    .provider
                    .clone()
                    .or_else(|| record.providers.last().cloned());
                activation = Some(DealEntry {
                    deal_id,
                    piece_cid: cid.clone(),
                    piece_size,
                    provider: provider.clone(),
                });
                DealEvent::DealActivated {
                    piece_cid: cid.clone(),
                    deal_id,
                    provider,
                    timestamp: now,
                }
            }
            DealStatus::Terminated => DealEvent::DealTerminated {
                piece_cid: cid.clone(),
                deal_id: record.deal_id,
                previous_status,
                timestamp: now,
            },
            // No transition ever targets Proposed
            DealStatus::Proposed => {
                return Err(DealClientError::InvalidStateTransition {
                    from: previous_status.to_string(),
                    to: DealStatus::Proposed.to_string(),
                })
            }
        };

        Ok(StagedUpdate {
            record,
            activation,
            event,
        })
    }

    fn check_binding(&self, record: &DealRecord, cid: &PieceCid, deal_id: u64) -> Result<()> {
        if let Some(bound) = record.deal_id {
            if bound != deal_id {
                return Err(DealClientError::AlreadyExists(format!(
                    "piece {} is already bound to deal {}",
                    cid, bound
                )));
            }
        }
        // Deals from an earlier lifecycle of the same piece stay retired
        if self.deal_index.contains_key(&deal_id) {
            return Err(DealClientError::AlreadyExists(format!(
                "deal {} is already recorded",
                deal_id
            )));
        }
        match self.deal_pieces.get(&deal_id) {
            Some(owner) if owner != cid => Err(DealClientError::AlreadyExists(format!(
                "deal {} is already bound to piece {}",
                deal_id, owner
            ))),
            _ => Ok(()),
        }
    }

    fn commit(&mut self, cid: PieceCid, update: StagedUpdate) {
        if let Some(deal_id) = update.record.deal_id {
            self.deal_pieces.insert(deal_id, cid.clone());
        }
        if let Some(entry) = update.activation {
            self.deal_index.insert(entry.deal_id, self.deals.len());
            self.deals.push(entry);
        }
        self.records.insert(cid, update.record);
    }

    fn record(&self, cid: &PieceCid) -> Result<&DealRecord> {
        self.records
            .get(cid)
            .ok_or_else(|| DealClientError::NotFound(format!("piece {}", cid)))
    }

    fn stored_proposal(&self, id: &ProposalId) -> Result<&StoredProposal> {
        self.proposals
            .get(id)
            .ok_or_else(|| DealClientError::NotFound(format!("proposal {}", id)))
    }

    fn deal_entry(&self, deal_id: u64) -> Result<&DealEntry> {
        self.deal_index
            .get(&deal_id)
            .and_then(|&idx| self.deals.get(idx))
            .ok_or_else(|| DealClientError::NotFound(format!("deal {}", deal_id)))
    }
}

/// Registry of storage deal proposals and their market status
pub struct DealClient {
    config: DealClientConfig,
    actor: Arc<dyn SystemActorClient>,
    state: Arc<RwLock<RegistryState>>,
    event_tx: Option<mpsc::UnboundedSender<DealEvent>>,
}

impl DealClient {
    pub fn new(config: DealClientConfig, actor: Arc<dyn SystemActorClient>) -> Self {
        Self {
            config,
            actor,
            state: Arc::new(RwLock::new(RegistryState::default())),
            event_tx: None,
        }
    }

    /// Create a registry that streams `DealEvent`s to the returned receiver
    pub fn with_events(
        config: DealClientConfig,
        actor: Arc<dyn SystemActorClient>,
    ) -> (Self, mpsc::UnboundedReceiver<DealEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut client = Self::new(config, actor);
        client.event_tx = Some(tx);
        (client, rx)
    }

    pub fn config(&self) -> &DealClientConfig {
        &self.config
    }

    /// Submit a proposal to the market actor.
    ///
    /// The write lock is held across the actor call, so the whole operation
    /// either commits or leaves the registry untouched. The actor reports a
    /// synchronous status through the call's return value; it must not
    /// re-enter the registry while the call is in flight.
    pub async fn propose(
        &self,
        caller: AccountAddress,
        proposal: DealProposal,
    ) -> Result<ProposalId> {
        if caller != self.config.owner {
            return Err(DealClientError::Forbidden(format!(
                "{} is not the owner",
                caller
            )));
        }
        self.validate_proposal(&proposal)?;

        let encoded = proposal.encode()?;
        let proposal_id = ProposalId::from_encoding(&encoded);
        let cid = proposal.piece_cid.clone();

        let mut state = self.state.write().await;

        if state.proposals.contains_key(&proposal_id) {
            return Err(DealClientError::AlreadyExists(format!(
                "proposal {}",
                proposal_id
            )));
        }

        let mut record = match state.records.get(&cid) {
            None => DealRecord::new(caller),
            Some(existing) if existing.status.is_terminal() => {
                debug!(piece_cid = %cid, "Restarting lifecycle of terminated piece");
                DealRecord::new(caller)
            }
            Some(existing) if existing.status == DealStatus::Proposed => existing.clone(),
            Some(existing) => {
                return Err(DealClientError::AlreadyExists(format!(
                    "piece {} is already {}",
                    cid, existing.status
                )))
            }
        };
        record.proposal_ids.push(proposal_id);

        let response = self
            .actor
            .call(PUBLISH_STORAGE_DEALS_METHOD, &encoded)
            .await
            .map_err(|e| {
                warn!(
                    piece_cid = %cid,
                    proposal_id = %proposal_id,
                    error = %e,
                    "❌ Publish call rejected"
                );
                DealClientError::from(e)
            })?;

        let mut events = vec![DealEvent::ProposalCreated {
            proposal_id,
            piece_cid: cid.clone(),
            client: caller,
            piece_size: proposal.piece_size,
            verified_deal: proposal.verified_deal,
            timestamp: Utc::now(),
        }];

        // Stored before staging so an activation can see the piece size
        state.proposals.insert(
            proposal_id,
            StoredProposal {
                piece_cid: cid.clone(),
                proposal: proposal.clone(),
                encoded,
            },
        );

        let staged = match response {
            Some(payload) => match self.stage_sync_response(&state, record.clone(), &cid, &payload)
            {
                Ok(update) => update,
                Err(e) => {
                    state.proposals.remove(&proposal_id);
                    return Err(e);
                }
            },
            None => None,
        };

        match staged {
            Some(update) => {
                events.push(update.event.clone());
                state.commit(cid.clone(), update);
            }
            None => {
                state.records.insert(cid.clone(), record);
            }
        }
        let status = state.record(&cid).map(|r| r.status)?;
        drop(state);

        info!(
            piece_cid = %cid,
            proposal_id = %proposal_id,
            client = %caller,
            piece_size = proposal.piece_size,
            start_epoch = proposal.start_epoch,
            end_epoch = proposal.end_epoch,
            status = %status,
            "📝 Deal proposal submitted"
        );

        for event in events {
            self.emit(event);
        }
        Ok(proposal_id)
    }

    fn stage_sync_response(
        &self,
        state: &RegistryState,
        record: DealRecord,
        cid: &PieceCid,
        payload: &[u8],
    ) -> Result<Option<StagedUpdate>> {
        let notification = DealNotification::decode_with(payload, self.config.decode)?;
        if &notification.piece_cid != cid {
            return Err(DealClientError::InvalidEncoding(format!(
                "publish response names piece {}, expected {}",
                notification.piece_cid, cid
            )));
        }
        state.stage_notification(record, &notification).map(Some)
    }

    fn validate_proposal(&self, proposal: &DealProposal) -> Result<()> {
        if proposal.start_epoch >= proposal.end_epoch {
            return Err(DealClientError::InvalidEpochRange {
                start: proposal.start_epoch,
                end: proposal.end_epoch,
            });
        }

        if !proposal.piece_size.is_power_of_two() {
            return Err(DealClientError::InvalidProposal(format!(
                "piece size {} is not a power of two",
                proposal.piece_size
            )));
        }

        if proposal.label.len() > self.config.max_label_len {
            return Err(DealClientError::InvalidProposal(format!(
                "label is {} bytes, limit is {}",
                proposal.label.len(),
                self.config.max_label_len
            )));
        }

        Ok(())
    }

    /// Entry point for calls made by the market actor.
    ///
    /// Both the notify and the authenticate methods carry a `DealNotification`.
    pub async fn handle_filecoin_method(
        &self,
        caller: AccountAddress,
        method: u64,
        codec: u64,
        params: &[u8],
    ) -> Result<()> {
        self.require_system_actor(caller)?;

        match method {
            MARKET_NOTIFY_DEAL_METHOD | AUTHENTICATE_MESSAGE_METHOD => {
                if codec != CBOR_CODEC {
                    return Err(DealClientError::InvalidEncoding(format!(
                        "unsupported codec {:#x}",
                        codec
                    )));
                }
                self.notify_deal(caller, params).await
            }
            other => {
                warn!(method = other, "Unsupported actor method");
                Err(DealClientError::UnsupportedMethod(other))
            }
        }
    }

    /// Apply a status notification from the market actor.
    pub async fn notify_deal(&self, caller: AccountAddress, payload: &[u8]) -> Result<()> {
        self.require_system_actor(caller)?;

        let notification = DealNotification::decode_with(payload, self.config.decode)?;
        let cid = notification.piece_cid.clone();

        let mut state = self.state.write().await;
        let record = state.record(&cid)?.clone();
        let update = state.stage_notification(record, &notification).map_err(|e| {
            warn!(
                piece_cid = %cid,
                status = %notification.status,
                error = %e,
                "Rejected deal notification"
            );
            e
        })?;
        let event = update.event.clone();
        state.commit(cid.clone(), update);
        let deals_length = state.deals.len();
        drop(state);

        match notification.status {
            DealStatus::Activated => info!(
                piece_cid = %cid,
                deal_id = ?notification.deal_id,
                provider = ?notification.provider,
                deals_length,
                "✅ Deal activated"
            ),
            DealStatus::Terminated => info!(
                piece_cid = %cid,
                deal_id = ?notification.deal_id,
                "🛑 Deal terminated"
            ),
            status => info!(
                piece_cid = %cid,
                deal_id = ?notification.deal_id,
                status = %status,
                "📣 Deal status updated"
            ),
        }

        self.emit(event);
        Ok(())
    }

    fn require_system_actor(&self, caller: AccountAddress) -> Result<()> {
        if caller != self.config.system_actor {
            warn!(caller = %caller, "Callback from unauthorized caller");
            return Err(DealClientError::Forbidden(format!(
                "{} is not the system actor",
                caller
            )));
        }
        Ok(())
    }

    fn emit(&self, event: DealEvent) {
        if let Some(ref tx) = self.event_tx {
            if let Err(e) = tx.send(event) {
                warn!(error = %e, "Failed to emit deal event");
            }
        }
    }

    pub async fn piece_status(&self, piece_cid: &PieceCid) -> Result<DealStatus> {
        let state = self.state.read().await;
        Ok(state.record(piece_cid)?.status)
    }

    pub async fn provider_set(&self, piece_cid: &PieceCid) -> Result<Vec<ProviderAddress>> {
        let state = self.state.read().await;
        Ok(state.record(piece_cid)?.providers.clone())
    }

    pub async fn proposal_id_set(&self, piece_cid: &PieceCid) -> Result<Vec<ProposalId>> {
        let state = self.state.read().await;
        Ok(state.record(piece_cid)?.proposal_ids.clone())
    }

    pub async fn deal_record(&self, piece_cid: &PieceCid) -> Result<DealRecord> {
        let state = self.state.read().await;
        state.record(piece_cid).cloned()
    }

    pub async fn deals_length(&self) -> usize {
        self.state.read().await.deals.len()
    }

    pub async fn deal_by_index(&self, index: usize) -> Result<DealEntry> {
        let state = self.state.read().await;
        state
            .deals
            .get(index)
            .cloned()
            .ok_or_else(|| DealClientError::NotFound(format!("deal index {}", index)))
    }

    pub async fn deal_commitment(&self, deal_id: u64) -> Result<DealCommitment> {
        let state = self.state.read().await;
        let entry = state.deal_entry(deal_id)?;
        Ok(DealCommitment {
            data: entry.piece_cid.as_bytes().to_vec(),
            size: entry.piece_size,
        })
    }

    pub async fn get_deal_id(&self, piece_cid: &PieceCid) -> Result<u64> {
        let state = self.state.read().await;
        state
            .record(piece_cid)?
            .deal_id
            .ok_or_else(|| DealClientError::NotFound(format!("no deal id for piece {}", piece_cid)))
    }

    /// Canonical encoding of a submitted proposal
    pub async fn get_deal_proposal(&self, proposal_id: &ProposalId) -> Result<Vec<u8>> {
        let state = self.state.read().await;
        Ok(state.stored_proposal(proposal_id)?.encoded.clone())
    }

    pub async fn get_extra_params(&self, proposal_id: &ProposalId) -> Result<Vec<u8>> {
        let state = self.state.read().await;
        state.stored_proposal(proposal_id)?.proposal.extra_params.encode()
    }

    pub async fn proposal(&self, proposal_id: &ProposalId) -> Result<DealProposal> {
        let state = self.state.read().await;
        Ok(state.stored_proposal(proposal_id)?.proposal.clone())
    }

    pub async fn proposal_piece(&self, proposal_id: &ProposalId) -> Result<PieceCid> {
        let state = self.state.read().await;
        Ok(state.stored_proposal(proposal_id)?.piece_cid.clone())
    }
}

#[async_trait]
impl DealRegistryView for DealClient {
    async fn deal_by_id(&self, deal_id: u64) -> Result<DealInfo> {
        let state = self.state.read().await;
        let entry = state.deal_entry(deal_id)?;
        let record = state.record(&entry.piece_cid)?;

        // A restarted lifecycle leaves earlier deals behind as terminated
        let status = if record.deal_id == Some(deal_id) {
            record.status
        } else {
            DealStatus::Terminated
        };

        Ok(DealInfo {
            deal_id,
            piece_cid: entry.piece_cid.clone(),
            client: record.client,
            piece_size: entry.piece_size,
            status,
            provider: entry.provider.clone(),
        })
    }

    async fn piece_status(&self, piece_cid: &PieceCid) -> Result<DealStatus> {
        DealClient::piece_status(self, piece_cid).await
    }
}
