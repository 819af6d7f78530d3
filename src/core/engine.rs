//! Transfer orchestration
//!
//! `TransferEngine` is the single entry point for moving money. It checks the
//! request shape before touching the store, then delegates the read, the
//! account-level checks and the write to exactly one
//! [`ConcurrencyStrategy`].
//!
//! # Architecture
//!
//! ```text
//! TransferEngine
//!     ├── Arc<dyn LedgerStore>          (shared ledger, invariant hooks)
//!     ├── Arc<dyn ConcurrencyStrategy>  (lock or optimistic write path)
//!     └── RetryPolicy                   (bound for transfer_with_retry)
//! ```
//!
//! Business outcomes come back as `Ok(TransferOutcome)`. Storage failures
//! are logged and returned as `Err(TransferError)`, and never retried.

use crate::config::RetryPolicy;
use crate::core::validation::validate_request;
use crate::store::LedgerStore;
use crate::strategy::ConcurrencyStrategy;
use crate::types::{TransferError, TransferOutcome, TransferRequest};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Orchestrator for concurrent transfers
///
/// Cheap to clone; clones share the store and the strategy.
#[derive(Clone)]
pub struct TransferEngine {
    store: Arc<dyn LedgerStore>,
    strategy: Arc<dyn ConcurrencyStrategy>,
    retry: RetryPolicy,
}

impl TransferEngine {
    /// Create an engine with the default [`RetryPolicy`]
    pub fn new(store: Arc<dyn LedgerStore>, strategy: Arc<dyn ConcurrencyStrategy>) -> Self {
        Self {
            store,
            strategy,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Move `request.amount` from `request.sender` to `request.recipient`
    ///
    /// Makes exactly one attempt. A `Conflict` is returned to the caller
    /// as-is.
    ///
    /// # Arguments
    ///
    /// * `request` - The transfer to apply, possibly malformed
    ///
    /// # Returns
    ///
    /// * `Ok(TransferOutcome::Success(receipt))` - Both balances committed
    /// * `Ok(outcome)` - Any other business result; nothing was changed
    /// * `Err(TransferError)` - The store failed; the transaction was rolled back
    pub async fn transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferOutcome, TransferError> {
        let transfer = match validate_request(request) {
            Ok(transfer) => transfer,
            Err(outcome) => {
                debug!(
                    sender = request.sender,
                    recipient = request.recipient,
                    status = outcome.status(),
                    "request rejected"
                );
                return Ok(outcome);
            }
        };

        match self.strategy.execute(self.store.as_ref(), &transfer).await {
            Ok(outcome) => {
                debug!(
                    strategy = self.strategy.name(),
                    sender = transfer.sender,
                    recipient = transfer.recipient,
                    amount = %transfer.amount,
                    status = outcome.status(),
                    "transfer finished"
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(
                    strategy = self.strategy.name(),
                    sender = transfer.sender,
                    recipient = transfer.recipient,
                    error = %e,
                    "transfer failed"
                );
                Err(e.into())
            }
        }
    }

    /// [`transfer`](Self::transfer), retrying `Conflict` outcomes
    ///
    /// Each retry starts again from a fresh read. Retries stop after
    /// `RetryPolicy::max_retries`; the last `Conflict` is then returned.
    ///
    /// # Returns
    ///
    /// The first non-`Conflict` outcome, the final `Conflict` once retries run
    /// out, or the first fatal error (never retried).
    pub async fn transfer_with_retry(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferOutcome, TransferError> {
        let mut outcome = self.transfer(request).await?;
        let mut retry = 0;

        while outcome.is_conflict() && retry < self.retry.max_retries {
            tokio::time::sleep(self.retry.backoff(retry)).await;
            retry += 1;
            debug!(
                sender = request.sender,
                recipient = request.recipient,
                retry,
                "retrying after conflict"
            );
            outcome = self.transfer(request).await?;
        }

        if outcome.is_conflict() && self.retry.max_retries > 0 {
            warn!(
                sender = request.sender,
                recipient = request.recipient,
                retries = retry,
                "conflict persisted after retries"
            );
        }
        Ok(outcome)
    }
}

impl fmt::Debug for TransferEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferEngine")
            .field("strategy", &self.strategy.name())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
