use crate::config::{BatchConfig, RetryPolicy};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Apply money transfers between ledger accounts
#[derive(Parser, Debug)]
#[command(name = "transfer-engine")]
#[command(about = "Apply money transfers between ledger accounts", long_about = None)]
pub struct CliArgs {
    /// Accounts CSV file (currency,balance,owner)
    #[arg(value_name = "ACCOUNTS", help = "Path to the accounts CSV file")]
    pub accounts_file: PathBuf,

    /// Transfers CSV file (sender,recipient,amount)
    #[arg(value_name = "TRANSFERS", help = "Path to the transfers CSV file")]
    pub transfers_file: PathBuf,

    /// Concurrency strategy used to apply each transfer
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "optimistic",
        help = "Concurrency strategy: 'lock' for per-account locks or 'optimistic' for versioned writes"
    )]
    pub strategy: StrategyType,

    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of transfers per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Worker threads applying a batch (default: CPU cores)"
    )]
    pub max_concurrent: Option<usize>,

    #[arg(
        long = "max-retries",
        value_name = "COUNT",
        help = "Retries after a CONFLICT outcome (default: 3)"
    )]
    pub max_retries: Option<u32>,

    #[arg(
        long = "backoff-ms",
        value_name = "MILLIS",
        help = "Initial retry backoff in milliseconds, doubled per retry (default: 5)"
    )]
    pub backoff_ms: Option<u64>,

    /// Per-transfer outcome CSV file
    #[arg(
        long = "outcomes",
        value_name = "PATH",
        help = "Write sender,recipient,amount,status for every transfer to PATH"
    )]
    pub outcomes_file: Option<PathBuf>,

    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        default_value = "info",
        help = "Log level when RUST_LOG is not set"
    )]
    pub log_level: String,

    #[arg(long = "log-json", help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

/// Available concurrency strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Lock,
    Optimistic,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values take their defaults. Zero values are replaced by
    /// [`BatchConfig::new`] with a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent.unwrap_or(default.max_concurrent),
            )
        } else {
            BatchConfig::default()
        }
    }

    pub fn to_retry_policy(&self) -> RetryPolicy {
        let default = RetryPolicy::default();
        RetryPolicy::new(
            self.max_retries.unwrap_or(default.max_retries),
            self.backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(default.initial_backoff),
        )
    }
}
