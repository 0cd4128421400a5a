use crate::types::{AccountAddress, TokenAmount};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Completed transfer, kept for history queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub from: AccountAddress,
    pub to: AccountAddress,
    pub amount: TokenAmount,
    pub timestamp: DateTime<Utc>,
    pub tx_hash: String,
}

type BalanceMap = HashMap<AccountAddress, TokenAmount>;

#[async_trait]
pub trait LedgerStorage: Send + Sync {
    async fn get_balance(&self, address: AccountAddress) -> Result<TokenAmount>;
    async fn set_balance(&self, address: AccountAddress, balance: TokenAmount) -> Result<()>;

    async fn begin_transaction(&self) -> Result<()>;
    async fn commit_transaction(&self) -> Result<()>;
    async fn rollback_transaction(&self) -> Result<()>;

    async fn record_transfer(&self, record: TransferRecord) -> Result<()>;
    async fn get_transfer_history(&self, address: AccountAddress) -> Result<Vec<TransferRecord>>;
}

pub struct MemoryStorage {
    balances: Arc<RwLock<BalanceMap>>,
    snapshot: Arc<RwLock<Option<BalanceMap>>>,
    history: Arc<RwLock<Vec<TransferRecord>>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            balances: Arc::new(RwLock::new(HashMap::new())),
            snapshot: Arc::new(RwLock::new(None)),
            history: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn get_balance(&self, address: AccountAddress) -> Result<TokenAmount> {
        let balances = self.balances.read().await;
        Ok(balances.get(&address).cloned().unwrap_or_default())
    }

    async fn set_balance(&self, address: AccountAddress, balance: TokenAmount) -> Result<()> {
        let mut balances = self.balances.write().await;
        if balance.is_zero() {
            balances.remove(&address);
        } else {
            balances.insert(address, balance.clone());
        }

        debug!(
            address = %address,
            balance = %balance,
            storage_type = "memory",
            "Balance stored"
        );
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<()> {
        let mut snapshot = self.snapshot.write().await;
        if snapshot.is_some() {
            bail!("Transaction already in progress");
        }

        let balances = self.balances.read().await;
        *snapshot = Some(balances.clone());

        debug!(
            accounts_count = balances.len(),
            storage_type = "memory",
            "Transaction began (snapshot created)"
        );
        Ok(())
    }

    async fn commit_transaction(&self) -> Result<()> {
        let mut snapshot = self.snapshot.write().await;
        if snapshot.take().is_none() {
            bail!("No transaction in progress");
        }
        debug!(storage_type = "memory", "Transaction committed");
        Ok(())
    }

    async fn rollback_transaction(&self) -> Result<()> {
        let mut snapshot = self.snapshot.write().await;
        if let Some(backup) = snapshot.take() {
            let mut balances = self.balances.write().await;
            *balances = backup;
            info!(
                accounts_after = balances.len(),
                storage_type = "memory",
                "Transaction rolled back (snapshot restored)"
            );
        }
        Ok(())
    }

    async fn record_transfer(&self, record: TransferRecord) -> Result<()> {
        let mut history = self.history.write().await;
        history.push(record);
        Ok(())
    }

    async fn get_transfer_history(&self, address: AccountAddress) -> Result<Vec<TransferRecord>> {
        let history = self.history.read().await;
        Ok(history
            .iter()
            .filter(|tx| tx.from == address || tx.to == address)
            .cloned()
            .collect())
    }
}
