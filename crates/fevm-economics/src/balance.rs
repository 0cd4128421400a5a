use crate::storage::{LedgerStorage, TransferRecord};
use crate::types::{AccountAddress, TokenAmount};
use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct BalanceManager {
    storage: Arc<dyn LedgerStorage>,
    // Serializes balance mutations so a transfer's snapshot covers only itself
    write_lock: Mutex<()>,
}

impl BalanceManager {
    pub fn new(storage: Arc<dyn LedgerStorage>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn get_balance(&self, address: AccountAddress) -> Result<TokenAmount> {
        self.storage.get_balance(address).await
    }

    pub async fn credit(&self, address: AccountAddress, amount: &TokenAmount) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;
        let current = self.storage.get_balance(address).await?;
        let new_balance = current
            .checked_add(amount)
            .ok_or_else(|| anyhow!("Balance overflow for {}", address))?;

        self.storage.set_balance(address, new_balance.clone()).await?;

        info!(
            address = %address,
            amount = %amount,
            balance_before = %current,
            balance_after = %new_balance,
            "💰 Balance credited"
        );
        Ok(())
    }

    pub async fn debit(&self, address: AccountAddress, amount: &TokenAmount) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;
        let current = self.storage.get_balance(address).await?;
        let new_balance = current.checked_sub(amount).ok_or_else(|| {
            anyhow!(
                "Insufficient balance for {}: has {}, needs {}",
                address,
                current,
                amount
            )
        })?;

        self.storage.set_balance(address, new_balance.clone()).await?;

        info!(
            address = %address,
            amount = %amount,
            balance_before = %current,
            balance_after = %new_balance,
            "💸 Balance debited"
        );
        Ok(())
    }

    /// Move `amount` between accounts; either both balances change or neither.
    ///
    /// Returns the transfer hash.
    pub async fn transfer(
        &self,
        from: AccountAddress,
        to: AccountAddress,
        amount: &TokenAmount,
    ) -> Result<String> {
        if from == to {
            bail!("Cannot transfer to same address");
        }

        let _guard = self.write_lock.lock().await;
        self.storage.begin_transaction().await?;

        match self.transfer_internal(from, to, amount).await {
            Ok(tx_hash) => {
                self.storage.commit_transaction().await?;

                let record = TransferRecord {
                    from,
                    to,
                    amount: amount.clone(),
                    timestamp: Utc::now(),
                    tx_hash: tx_hash.clone(),
                };
                if let Err(e) = self.storage.record_transfer(record).await {
                    debug!(tx_hash = %tx_hash, error = %e, "Failed to record transfer");
                }

                info!(
                    from = %from,
                    to = %to,
                    amount = %amount,
                    tx_hash = %tx_hash,
                    "✅ Transfer committed"
                );
                Ok(tx_hash)
            }
            Err(e) => {
                warn!(
                    from = %from,
                    to = %to,
                    amount = %amount,
                    error = %e,
                    "❌ Transfer rolled back"
                );
                self.storage.rollback_transaction().await?;
                Err(e)
            }
        }
    }

    async fn transfer_internal(
        &self,
        from: AccountAddress,
        to: AccountAddress,
        amount: &TokenAmount,
    ) -> Result<String> {
        let from_balance = self.storage.get_balance(from).await?;
        let new_from_balance = from_balance.checked_sub(amount).ok_or_else(|| {
            anyhow!(
                "Insufficient balance: {} has {}, needs {}",
                from,
                from_balance,
                amount
            )
        })?;

        let to_balance = self.storage.get_balance(to).await?;
        let new_to_balance = to_balance
            .checked_add(amount)
            .ok_or_else(|| anyhow!("Balance overflow for recipient {}", to))?;

        self.storage.set_balance(from, new_from_balance).await?;
        self.storage.set_balance(to, new_to_balance).await?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(from.as_bytes());
        hasher.update(to.as_bytes());
        hasher.update(&amount.to_be_bytes());
        hasher.update(&Utc::now().timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
        Ok(hex::encode(hasher.finalize().as_bytes()))
    }

    pub async fn get_transfer_history(&self, address: AccountAddress) -> Result<Vec<TransferRecord>> {
        self.storage.get_transfer_history(address).await
    }
}
