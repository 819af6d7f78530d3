//! Concurrency-control strategies for applying a transfer
//!
//! This module defines the Strategy pattern for the write path of a transfer.
//! The orchestrator validates the request shape and then hands the transfer
//! to exactly one strategy, which reads both accounts, runs the account-level
//! checks and writes the debit/credit pair inside one store transaction.
//!
//! - [`LockStrategy`] serializes transfers over shared accounts with the
//!   [`LockCoordinator`](crate::core::LockCoordinator)
//! - [`OptimisticStrategy`] writes with version-checked updates and reports
//!   `Conflict` when a concurrent writer got there first
//!
//! The store's write-time invariant check runs under both.

use crate::cli::StrategyType;
use crate::core::validation::ValidTransfer;
use crate::core::LockCoordinator;
use crate::store::{LedgerStore, LedgerTransaction};
use crate::types::{StoreError, TransferOutcome, TransferReceipt};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub mod lock;
pub mod optimistic;

pub use lock::LockStrategy;
pub use optimistic::OptimisticStrategy;

/// Interchangeable write path for a validated transfer
#[async_trait]
pub trait ConcurrencyStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Read, check and apply `transfer` against `store`
    ///
    /// # Returns
    ///
    /// * `Ok(outcome)` for every business result, with the transaction
    ///   committed on `Success` and rolled back otherwise
    /// * `Err(StoreError)` for unexpected storage failures
    async fn execute(
        &self,
        store: &dyn LedgerStore,
        transfer: &ValidTransfer,
    ) -> Result<TransferOutcome, StoreError>;
}

/// What a strategy decided to do with its open transaction
#[derive(Debug)]
pub(crate) enum Decision {
    Commit(TransferReceipt),
    Abort(TransferOutcome),
}

/// Commit or roll back `tx` according to the strategy's decision
///
/// Store signals that stand for business outcomes are translated here, after
/// the rollback, so both strategies report them the same way.
pub(crate) async fn finish(
    tx: Box<dyn LedgerTransaction>,
    decision: Result<Decision, StoreError>,
    transfer: &ValidTransfer,
) -> Result<TransferOutcome, StoreError> {
    match decision {
        Ok(Decision::Commit(receipt)) => {
            tx.commit().await?;
            Ok(TransferOutcome::Success(receipt))
        }
        Ok(Decision::Abort(outcome)) => {
            tx.rollback().await?;
            Ok(outcome)
        }
        Err(StoreError::InsufficientFunds { balance, .. }) => {
            tx.rollback().await?;
            Ok(transfer.insufficient_funds(balance))
        }
        Err(StoreError::RowBusy { account }) => {
            debug!(account, "row written by another transaction");
            tx.rollback().await?;
            Ok(TransferOutcome::Conflict)
        }
        Err(e) => {
            // a rollback failure is dropped in favour of `e`
            let _ = tx.rollback().await;
            Err(e)
        }
    }
}

/// Read both accounts back from `tx` after the writes
pub(crate) async fn receipt(
    tx: &mut dyn LedgerTransaction,
    transfer: &ValidTransfer,
) -> Result<TransferReceipt, StoreError> {
    let sender = tx
        .get_account(transfer.sender)
        .await?
        .ok_or(StoreError::AccountNotFound {
            account: transfer.sender,
        })?;
    let recipient = tx
        .get_account(transfer.recipient)
        .await?
        .ok_or(StoreError::AccountNotFound {
            account: transfer.recipient,
        })?;
    Ok(TransferReceipt { sender, recipient })
}

/// Create a concurrency strategy based on the specified strategy type
///
/// The lock strategy uses the process-wide [`LockCoordinator::shared`] pool.
pub fn create_strategy(strategy_type: StrategyType) -> Arc<dyn ConcurrencyStrategy> {
    create_strategy_with(strategy_type, LockCoordinator::shared())
}

/// Like [`create_strategy`], with the lock strategy using `coordinator`
///
/// The pool is keyed by account id only, so callers that run several
/// independent ledgers in one process give each ledger its own coordinator.
pub fn create_strategy_with(
    strategy_type: StrategyType,
    coordinator: Arc<LockCoordinator>,
) -> Arc<dyn ConcurrencyStrategy> {
    match strategy_type {
        StrategyType::Lock => Arc::new(LockStrategy::new(coordinator)),
        StrategyType::Optimistic => Arc::new(OptimisticStrategy),
    }
}
