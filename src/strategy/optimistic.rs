//! Optimistic strategy
//!
//! Reads both accounts with their version stamps, computes the new balances
//! in memory and writes each one with a version-checked update, in ascending
//! id order. If either update affects no rows the transaction is rolled back
//! and the transfer reports `Conflict`. The strategy never retries on its own.

use super::{finish, receipt, ConcurrencyStrategy, Decision};
use crate::core::validation::{credit, debit, validate_accounts, ValidTransfer};
use crate::store::{LedgerStore, LedgerTransaction};
use crate::types::{AccountId, StoreError, TransferOutcome, Version};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

/// Version-stamped compare-and-swap writes
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimisticStrategy;

impl OptimisticStrategy {
    async fn apply(
        &self,
        tx: &mut dyn LedgerTransaction,
        transfer: &ValidTransfer,
    ) -> Result<Decision, StoreError> {
        let recipient = tx.get_account_with_version(transfer.recipient).await?;
        let sender = tx.get_account_with_version(transfer.sender).await?;
        let checked = match validate_accounts(
            transfer,
            recipient.map(|(account, _)| account),
            sender.map(|(account, _)| account),
        ) {
            Ok(checked) => checked,
            Err(outcome) => return Ok(Decision::Abort(outcome)),
        };

        // fail fast instead of leaving the rejection to the store
        let sender_balance = match debit(transfer, &checked.sender) {
            Ok(balance) => balance,
            Err(outcome) => return Ok(Decision::Abort(outcome)),
        };
        let recipient_balance = credit(transfer, &checked.recipient)?;

        let mut writes: [(AccountId, Decimal, Version); 2] = [
            (checked.sender.id, sender_balance, checked.sender.version),
            (checked.recipient.id, recipient_balance, checked.recipient.version),
        ];
        writes.sort_by_key(|(id, _, _)| *id);

        for (id, balance, version) in writes {
            let rows = tx.conditional_update_balance(id, balance, version).await?;
            if rows == 0 {
                debug!(account = id, expected_version = version, "stale version");
                return Ok(Decision::Abort(TransferOutcome::Conflict));
            }
        }

        Ok(Decision::Commit(receipt(tx, transfer).await?))
    }
}

#[async_trait]
impl ConcurrencyStrategy for OptimisticStrategy {
    fn name(&self) -> &'static str {
        "optimistic"
    }

    async fn execute(
        &self,
        store: &dyn LedgerStore,
        transfer: &ValidTransfer,
    ) -> Result<TransferOutcome, StoreError> {
        let mut tx = store.begin().await?;
        let decision = self.apply(tx.as_mut(), transfer).await;
        finish(tx, decision, transfer).await
    }
}
