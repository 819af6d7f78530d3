//! Concurrent batch execution of transfer requests
//!
//! The `BatchProcessor` runs every request of a batch as its own tokio task,
//! so transfers over disjoint accounts proceed in parallel and transfers over
//! shared accounts are ordered by the engine's strategy. Reports come back
//! in input order.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::TransferEngine;
use crate::types::{TransferError, TransferOutcome, TransferRequest};
use tracing::error;

/// Result of processing a single transfer request
#[derive(Debug, Clone)]
pub struct TransferReport {
    /// The request that was processed
    pub request: TransferRequest,

    /// The outcome, or the fatal error that stopped it
    pub result: Result<TransferOutcome, TransferError>,
}

impl TransferReport {
    /// Status name, `FATAL_ERROR` for failures
    pub fn status(&self) -> &'static str {
        match &self.result {
            Ok(outcome) => outcome.status(),
            Err(_) => "FATAL_ERROR",
        }
    }
}

/// Per-status counts over any number of batches
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub counts: BTreeMap<&'static str, usize>,
}

impl BatchSummary {
    pub fn record(&mut self, reports: &[TransferReport]) {
        for report in reports {
            *self.counts.entry(report.status()).or_default() += 1;
        }
    }

    pub fn count(&self, status: &str) -> usize {
        self.counts.get(status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Runs batches of transfers concurrently against one engine
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    engine: Arc<TransferEngine>,
}

impl BatchProcessor {
    pub fn new(engine: Arc<TransferEngine>) -> Self {
        Self { engine }
    }

    /// Process a batch of transfer requests concurrently
    ///
    /// Each request gets one task running
    /// [`TransferEngine::transfer_with_retry`]. All requests are processed
    /// even if some fail, and the reports are in the same order as `batch`.
    ///
    /// # Arguments
    ///
    /// * `batch` - Requests to run concurrently
    ///
    /// # Returns
    ///
    /// One [`TransferReport`] per request. A task that panicked yields a
    /// report with a runtime error, so the batch is never cut short.
    pub async fn process_batch(&self, batch: Vec<TransferRequest>) -> Vec<TransferReport> {
        let mut tasks = Vec::with_capacity(batch.len());
        for request in batch {
            let engine = Arc::clone(&self.engine);
            let spawned = request.clone();
            let task = tokio::spawn(async move { engine.transfer_with_retry(&spawned).await });
            tasks.push((request, task));
        }

        let mut reports = Vec::with_capacity(tasks.len());
        for (request, task) in tasks {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => {
                    error!(
                        error = %e,
                        sender = request.sender,
                        recipient = request.recipient,
                        "transfer task failed"
                    );
                    Err(TransferError::runtime(format!("transfer task failed: {}", e)))
                }
            };
            reports.push(TransferReport { request, result });
        }

        reports
    }
}
