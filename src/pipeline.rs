//! File-to-file transfer processing
//!
//! Loads the account seeds into a fresh [`MemoryLedger`], streams the
//! transfer file through a [`BatchProcessor`] one batch at a time, and writes
//! the final account states. Batches run one after another; the transfers
//! inside a batch run concurrently on a multi-threaded tokio runtime.
//!
//! Each run gets its own [`LockCoordinator`], so pipelines running side by
//! side in one process never wait on each other's account locks.

use crate::cli::StrategyType;
use crate::config::{BatchConfig, RetryPolicy};
use crate::core::{BatchProcessor, BatchSummary, LockCoordinator, TransferEngine};
use crate::io::{read_accounts_file, write_accounts_csv, AsyncReader, OutcomeWriter};
use crate::store::{LedgerStore, MemoryLedger};
use crate::strategy::create_strategy_with;
use crate::types::TransferError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Totals of one pipeline run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSummary {
    pub accounts: usize,
    pub batches: usize,
    /// Transfer rows dropped because they could not be parsed
    pub skipped_rows: usize,
    pub outcomes: BatchSummary,
}

#[derive(Debug, Clone)]
pub struct TransferPipeline {
    strategy: StrategyType,
    batch: BatchConfig,
    retry: RetryPolicy,
}

impl TransferPipeline {
    pub fn new(strategy: StrategyType, batch: BatchConfig, retry: RetryPolicy) -> Self {
        Self {
            strategy,
            batch,
            retry,
        }
    }

    /// Run the pipeline
    ///
    /// # Arguments
    ///
    /// * `accounts_path` - CSV of `currency,balance,owner` seeds, ids assigned in file order
    /// * `transfers_path` - CSV of `sender,recipient,amount` requests
    /// * `output` - Receives the final `id,currency,balance,owner,version` rows
    /// * `outcomes` - Optionally receives one `sender,recipient,amount,status` row per transfer
    pub fn process(
        &self,
        accounts_path: &Path,
        transfers_path: &Path,
        output: &mut dyn Write,
        outcomes: Option<&mut dyn Write>,
    ) -> Result<PipelineSummary, TransferError> {
        let seeds = read_accounts_file(accounts_path)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.batch.max_concurrent)
            .enable_time()
            .build()
            .map_err(|e| TransferError::runtime(format!("Failed to create tokio runtime: {}", e)))?;

        runtime.block_on(async {
            let ledger = MemoryLedger::new();
            for seed in &seeds {
                ledger
                    .create_account(seed.currency, seed.balance, &seed.owner)
                    .await?;
            }

            // lock ids are only meaningful within this run's ledger
            let strategy = create_strategy_with(self.strategy, Arc::new(LockCoordinator::new()));
            let engine = TransferEngine::new(Arc::new(ledger.clone()), strategy)
                .with_retry_policy(self.retry.clone());
            let strategy_name = engine.strategy_name();
            let processor = BatchProcessor::new(Arc::new(engine));

            let file = tokio::fs::File::open(transfers_path)
                .await
                .map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => TransferError::FileNotFound {
                        path: transfers_path.display().to_string(),
                    },
                    _ => TransferError::from(e),
                })?;
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut outcome_writer = match outcomes {
                Some(out) => Some(OutcomeWriter::new(out)?),
                None => None,
            };

            let mut summary = PipelineSummary {
                accounts: seeds.len(),
                ..PipelineSummary::default()
            };

            loop {
                let batch = reader.read_batch(self.batch.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                let reports = processor.process_batch(batch).await;
                summary.batches += 1;
                summary.outcomes.record(&reports);
                if let Some(writer) = outcome_writer.as_mut() {
                    writer.write_reports(&reports)?;
                }
            }
            summary.skipped_rows = reader.skipped();

            if let Some(writer) = outcome_writer {
                writer.finish()?;
            }

            let accounts = ledger.accounts().await?;
            write_accounts_csv(&accounts, output)?;

            info!(
                strategy = strategy_name,
                accounts = summary.accounts,
                transfers = summary.outcomes.total(),
                succeeded = summary.outcomes.count("SUCCESS"),
                conflicts = summary.outcomes.count("CONFLICT"),
                skipped_rows = summary.skipped_rows,
                "transfer file processed"
            );

            Ok::<_, TransferError>(summary)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn pipeline(batch_size: usize) -> TransferPipeline {
        TransferPipeline::new(
            StrategyType::Optimistic,
            BatchConfig::new(batch_size, 2),
            RetryPolicy::default(),
        )
    }

    #[test]
    fn test_pipeline_applies_transfers() {
        let accounts = create_temp_csv("currency,balance,owner\nUSD,100,alice\nUSD,0,bob\n");
        let transfers = create_temp_csv("sender,recipient,amount\n1,2,30\n2,1,10\n");
        let mut output: Vec<u8> = Vec::new();

        let summary = pipeline(1)
            .process(accounts.path(), transfers.path(), &mut output, None)
            .unwrap();

        assert_eq!(summary.accounts, 2);
        assert_eq!(summary.batches, 2);
        assert_eq!(summary.outcomes.count("SUCCESS"), 2);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "id,currency,balance,owner,version\n1,USD,80.0000,alice,2\n2,USD,20.0000,bob,2\n"
        );
    }

    #[test]
    fn test_pipeline_writes_outcomes() {
        let accounts = create_temp_csv("currency,balance,owner\nUSD,10,alice\nEUR,0,bob\n");
        let transfers = create_temp_csv("sender,recipient,amount\n1,2,5\n1,3,5\n1,1,5\n");
        let mut output: Vec<u8> = Vec::new();
        let mut outcomes: Vec<u8> = Vec::new();

        pipeline(10)
            .process(
                accounts.path(),
                transfers.path(),
                &mut output,
                Some(&mut outcomes),
            )
            .unwrap();

        assert_eq!(
            String::from_utf8(outcomes).unwrap(),
            "sender,recipient,amount,status\n\
             1,2,5,CURRENCY_MISMATCH\n\
             1,3,5,RECIPIENT_NOT_FOUND\n\
             1,1,5,INVALID_REQUEST\n"
        );
    }

    #[test]
    fn test_pipeline_missing_transfer_file() {
        let accounts = create_temp_csv("currency,balance,owner\nUSD,10,alice\n");
        let mut output: Vec<u8> = Vec::new();

        let err = pipeline(10)
            .process(
                accounts.path(),
                Path::new("nonexistent.csv"),
                &mut output,
                None,
            )
            .unwrap_err();

        assert!(matches!(err, TransferError::FileNotFound { .. }));
        assert!(output.is_empty());
    }

    #[test]
    fn test_pipeline_rejects_negative_seed() {
        let accounts = create_temp_csv("currency,balance,owner\nUSD,-1,alice\n");
        let transfers = create_temp_csv("sender,recipient,amount\n");
        let mut output: Vec<u8> = Vec::new();

        let err = pipeline(10)
            .process(accounts.path(), transfers.path(), &mut output, None)
            .unwrap_err();

        assert!(matches!(err, TransferError::Store(_)));
    }

    #[test]
    fn test_pipeline_counts_skipped_rows() {
        let accounts = create_temp_csv("currency,balance,owner\nUSD,10,alice\nUSD,0,bob\n");
        let transfers = create_temp_csv("sender,recipient,amount\nabc,2,1\n1,2,1\n");
        let mut output: Vec<u8> = Vec::new();

        let summary = pipeline(10)
            .process(accounts.path(), transfers.path(), &mut output, None)
            .unwrap();

        assert_eq!(summary.skipped_rows, 1);
        assert_eq!(summary.outcomes.total(), 1);
    }

    #[test]
    fn test_lock_pipeline_ignores_shared_pool() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _held = runtime.block_on(LockCoordinator::shared().acquire(&[1, 2]));

        let (done, finished) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let accounts = create_temp_csv("currency,balance,owner\nUSD,10,alice\nUSD,0,bob\n");
            let transfers = create_temp_csv("sender,recipient,amount\n1,2,4\n");
            let mut output: Vec<u8> = Vec::new();
            let summary = TransferPipeline::new(
                StrategyType::Lock,
                BatchConfig::new(10, 2),
                RetryPolicy::default(),
            )
            .process(accounts.path(), transfers.path(), &mut output, None)
            .unwrap();
            done.send(summary).unwrap();
        });

        let summary = finished
            .recv_timeout(std::time::Duration::from_secs(10))
            .expect("pipeline waited on the process-wide lock pool");
        assert_eq!(summary.outcomes.count("SUCCESS"), 1);
    }
}
