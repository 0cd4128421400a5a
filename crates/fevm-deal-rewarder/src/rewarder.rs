//! Bounty ledger
//!
//! Deposits sit in a dedicated escrow account. A bounty names a piece and
//! the size the storing deal must have; once the deal registry reports the
//! deal as activated, the bounty is paid to the deal's client exactly once.
//!
//! Escrow is split into reserved and unreserved funds. Earmarked deposits
//! and open bounty rewards are reserved; a claim only ever spends the
//! reservation of its own bounty.

use crate::config::RewarderConfig;
use crate::error::{Result, RewarderError};
use crate::events::RewarderEvent;
use chrono::Utc;
use fevm_deal_client::{DealRegistryView, DealStatus, PieceCid};
use fevm_economics::{AccountAddress, BalanceManager, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

/// Open or paid bounty for one piece
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BountyEntry {
    pub piece_size: u64,
    pub reward: TokenAmount,
    pub claimed: bool,
    /// Deal that collected the reward
    pub claimed_by_deal: Option<u64>,
}

#[derive(Default)]
struct LedgerState {
    bounties: HashMap<PieceCid, BountyEntry>,
    /// Funds deposited for pieces that have no bounty yet
    earmarked: HashMap<PieceCid, TokenAmount>,
    /// Earmarked funds plus the rewards of open bounties
    reserved: TokenAmount,
}

impl LedgerState {
    fn reserve(&mut self, amount: &TokenAmount) -> Result<()> {
        self.reserved = self
            .reserved
            .checked_add(amount)
            .ok_or_else(|| RewarderError::Economics("reserved escrow overflows".to_string()))?;
        Ok(())
    }

    fn release(&mut self, amount: &TokenAmount) {
        self.reserved = self.reserved.saturating_sub(amount);
    }
}

pub struct DealRewarder {
    config: RewarderConfig,
    registry: Arc<dyn DealRegistryView>,
    balances: Arc<BalanceManager>,
    state: Arc<RwLock<LedgerState>>,
    event_tx: Option<mpsc::UnboundedSender<RewarderEvent>>,
}

impl DealRewarder {
    pub fn new(
        config: RewarderConfig,
        registry: Arc<dyn DealRegistryView>,
        balances: Arc<BalanceManager>,
    ) -> Self {
        Self {
            config,
            registry,
            balances,
            state: Arc::new(RwLock::new(LedgerState::default())),
            event_tx: None,
        }
    }

    /// Create a rewarder that streams `RewarderEvent`s to the returned receiver
    pub fn with_events(
        config: RewarderConfig,
        registry: Arc<dyn DealRegistryView>,
        balances: Arc<BalanceManager>,
    ) -> (Self, mpsc::UnboundedReceiver<RewarderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut rewarder = Self::new(config, registry, balances);
        rewarder.event_tx = Some(tx);
        (rewarder, rx)
    }

    pub fn config(&self) -> &RewarderConfig {
        &self.config
    }

    /// Deposit `amount` from `caller` into escrow, optionally earmarked for a piece.
    ///
    /// Earmarked funds top up an open bounty, or wait for `add_bounty` to
    /// become its reward.
    pub async fn fund(
        &self,
        caller: AccountAddress,
        amount: TokenAmount,
        piece_cid: Option<PieceCid>,
    ) -> Result<()> {
        let escrow = self.config.escrow_account;
        if caller == escrow {
            return Err(RewarderError::Forbidden(
                "escrow account cannot fund itself".to_string(),
            ));
        }

        let mut state = self.state.write().await;

        // Work out the new earmark before any funds move
        let earmark = match &piece_cid {
            Some(cid) => {
                let current = match state.bounties.get(cid) {
                    Some(bounty) if bounty.claimed => {
                        return Err(RewarderError::AlreadyClaimed(format!("piece {}", cid)))
                    }
                    Some(bounty) => bounty.reward.clone(),
                    None => state.earmarked.get(cid).cloned().unwrap_or_default(),
                };
                let total = current.checked_add(&amount).ok_or_else(|| {
                    RewarderError::Economics(format!("earmark for piece {} overflows", cid))
                })?;
                let reserved = state.reserved.checked_add(&amount).ok_or_else(|| {
                    RewarderError::Economics("reserved escrow overflows".to_string())
                })?;
                Some((cid.clone(), total, reserved))
            }
            None => None,
        };

        let available = self.balance_of(caller).await?;
        if available < amount {
            return Err(RewarderError::InsufficientFunds {
                required: amount.to_string(),
                available: available.to_string(),
            });
        }

        if !amount.is_zero() {
            self.balances
                .transfer(caller, escrow, &amount)
                .await
                .map_err(|e| RewarderError::Economics(e.to_string()))?;
        }

        if let Some((cid, total, reserved)) = earmark {
            state.reserved = reserved;
            match state.bounties.get_mut(&cid) {
                Some(bounty) => bounty.reward = total,
                None => {
                    state.earmarked.insert(cid, total);
                }
            }
        }
        drop(state);

        info!(
            from = %caller,
            amount = %amount,
            piece_cid = ?piece_cid,
            "💰 Bounty escrow funded"
        );

        self.emit(RewarderEvent::Funded {
            from: caller,
            amount,
            piece_cid,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Register a bounty for `piece_cid`. Owner only.
    ///
    /// Funds earmarked for the piece become the reward. Without an earmark the
    /// configured default reward is reserved from unreserved escrow, failing
    /// `InsufficientFunds` when the escrow cannot cover it.
    pub async fn add_bounty(
        &self,
        caller: AccountAddress,
        piece_cid: PieceCid,
        piece_size: u64,
    ) -> Result<BountyEntry> {
        if caller != self.config.owner {
            return Err(RewarderError::Forbidden(format!(
                "{} is not the owner",
                caller
            )));
        }

        let mut state = self.state.write().await;
        if state.bounties.contains_key(&piece_cid) {
            return Err(RewarderError::AlreadyExists(format!(
                "bounty for piece {}",
                piece_cid
            )));
        }

        let earmarked = state
            .earmarked
            .get(&piece_cid)
            .filter(|amount| !amount.is_zero())
            .cloned();
        let reward = match earmarked {
            Some(amount) => amount,
            None => {
                let reward = self.config.default_reward.clone();
                let available = self.unreserved(&state).await?;
                if available < reward {
                    return Err(RewarderError::InsufficientFunds {
                        required: reward.to_string(),
                        available: available.to_string(),
                    });
                }
                state.reserve(&reward)?;
                reward
            }
        };
        state.earmarked.remove(&piece_cid);
        let entry = BountyEntry {
            piece_size,
            reward: reward.clone(),
            claimed: false,
            claimed_by_deal: None,
        };
        state.bounties.insert(piece_cid.clone(), entry.clone());
        drop(state);

        info!(
            piece_cid = %piece_cid,
            piece_size,
            reward = %reward,
            "🎯 Bounty added"
        );

        self.emit(RewarderEvent::BountyAdded {
            piece_cid,
            piece_size,
            reward,
            timestamp: Utc::now(),
        });
        Ok(entry)
    }

    /// Pay the bounty for an activated deal to the deal's client.
    ///
    /// Verification, payout and the claimed flag all happen under the ledger
    /// write lock; a second claim for the same piece fails `AlreadyClaimed`
    /// without moving funds.
    pub async fn claim_bounty(&self, caller: AccountAddress, deal_id: u64) -> Result<TokenAmount> {
        let mut state = self.state.write().await;

        let deal = self.registry.deal_by_id(deal_id).await?;
        if deal.status != DealStatus::Activated {
            return Err(RewarderError::NotActivated {
                deal_id,
                status: deal.status,
            });
        }

        let bounty = state
            .bounties
            .get_mut(&deal.piece_cid)
            .ok_or_else(|| RewarderError::NotFound(format!("bounty for piece {}", deal.piece_cid)))?;

        if bounty.piece_size != deal.piece_size {
            return Err(RewarderError::SizeMismatch {
                expected: bounty.piece_size,
                actual: deal.piece_size,
            });
        }

        if bounty.claimed {
            warn!(
                piece_cid = %deal.piece_cid,
                deal_id,
                claimed_by_deal = ?bounty.claimed_by_deal,
                caller = %caller,
                "Repeated bounty claim rejected"
            );
            return Err(RewarderError::AlreadyClaimed(format!(
                "piece {}",
                deal.piece_cid
            )));
        }

        let escrow = self.config.escrow_account;
        let available = self.balance_of(escrow).await?;
        if available < bounty.reward {
            return Err(RewarderError::InsufficientFunds {
                required: bounty.reward.to_string(),
                available: available.to_string(),
            });
        }

        let reward = bounty.reward.clone();
        let tx_hash = self
            .balances
            .transfer(escrow, deal.client, &reward)
            .await
            .map_err(|e| RewarderError::Economics(e.to_string()))?;

        bounty.claimed = true;
        bounty.claimed_by_deal = Some(deal_id);
        state.release(&reward);
        drop(state);

        info!(
            piece_cid = %deal.piece_cid,
            deal_id,
            recipient = %deal.client,
            amount = %reward,
            tx_hash = %tx_hash,
            "🏆 Bounty claimed"
        );

        self.emit(RewarderEvent::BountyClaimed {
            piece_cid: deal.piece_cid,
            deal_id,
            recipient: deal.client,
            amount: reward.clone(),
            tx_hash,
            timestamp: Utc::now(),
        });
        Ok(reward)
    }

    pub async fn bounty(&self, piece_cid: &PieceCid) -> Result<BountyEntry> {
        let state = self.state.read().await;
        state
            .bounties
            .get(piece_cid)
            .cloned()
            .ok_or_else(|| RewarderError::NotFound(format!("bounty for piece {}", piece_cid)))
    }

    /// Funds waiting for a bounty on `piece_cid`
    pub async fn earmarked(&self, piece_cid: &PieceCid) -> TokenAmount {
        let state = self.state.read().await;
        state.earmarked.get(piece_cid).cloned().unwrap_or_default()
    }

    pub async fn escrow_balance(&self) -> Result<TokenAmount> {
        self.balance_of(self.config.escrow_account).await
    }

    /// Escrow held for earmarks and open bounties
    pub async fn reserved_balance(&self) -> TokenAmount {
        self.state.read().await.reserved.clone()
    }

    /// Escrow not yet promised to any piece
    pub async fn unreserved_balance(&self) -> Result<TokenAmount> {
        let state = self.state.read().await;
        self.unreserved(&state).await
    }

    async fn unreserved(&self, state: &LedgerState) -> Result<TokenAmount> {
        let escrow = self.balance_of(self.config.escrow_account).await?;
        Ok(escrow.saturating_sub(&state.reserved))
    }

    async fn balance_of(&self, address: AccountAddress) -> Result<TokenAmount> {
        self.balances
            .get_balance(address)
            .await
            .map_err(|e| RewarderError::Economics(e.to_string()))
    }

    fn emit(&self, event: RewarderEvent) {
        if let Some(ref tx) = self.event_tx {
            if let Err(e) = tx.send(event) {
                warn!(error = %e, "Failed to emit rewarder event");
            } else {
                debug!("Rewarder event emitted");
            }
        }
    }
}
