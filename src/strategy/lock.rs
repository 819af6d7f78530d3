//! Pessimistic strategy
//!
//! Locks every account of the transfer through the [`LockCoordinator`]
//! before reading anything, then performs read-check-write in one store
//! transaction with unconditional balance adjustments. The locks are
//! released once the transaction has been committed or rolled back.

use super::{finish, receipt, ConcurrencyStrategy, Decision};
use crate::core::validation::{validate_accounts, ValidTransfer};
use crate::core::LockCoordinator;
use crate::store::{LedgerStore, LedgerTransaction};
use crate::types::{StoreError, TransferOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Serializes transfers that share at least one account
#[derive(Debug, Clone)]
pub struct LockStrategy {
    coordinator: Arc<LockCoordinator>,
}

impl LockStrategy {
    pub fn new(coordinator: Arc<LockCoordinator>) -> Self {
        Self { coordinator }
    }

    async fn apply(
        &self,
        tx: &mut dyn LedgerTransaction,
        transfer: &ValidTransfer,
    ) -> Result<Decision, StoreError> {
        let recipient = tx.get_account(transfer.recipient).await?;
        let sender = tx.get_account(transfer.sender).await?;
        if let Err(outcome) = validate_accounts(transfer, recipient, sender) {
            return Ok(Decision::Abort(outcome));
        }

        for id in transfer.pair().ordered() {
            tx.update_balance(id, transfer.delta_for(id)).await?;
        }

        Ok(Decision::Commit(receipt(tx, transfer).await?))
    }
}

#[async_trait]
impl ConcurrencyStrategy for LockStrategy {
    fn name(&self) -> &'static str {
        "lock"
    }

    async fn execute(
        &self,
        store: &dyn LedgerStore,
        transfer: &ValidTransfer,
    ) -> Result<TransferOutcome, StoreError> {
        let locks = self.coordinator.acquire(&transfer.pair().ordered()).await;
        debug!(accounts = ?locks.ids(), "accounts locked");

        let mut tx = store.begin().await?;
        let decision = self.apply(tx.as_mut(), transfer).await;
        let outcome = finish(tx, decision, transfer).await;

        drop(locks);
        outcome
    }
}
