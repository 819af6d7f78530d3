//! Error types for the transfer engine
//!
//! Two layers of errors exist:
//!
//! - [`StoreError`] is raised by the ledger store. Some variants are signals
//!   the strategies translate into business outcomes (`InsufficientFunds`
//!   from the write-time invariant check, `RowBusy` from a competing writer).
//! - [`TransferError`] is fatal. It is returned to the caller, logged, and
//!   never retried. Business outcomes never travel through it.

use super::account::AccountId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by the ledger store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// A balance write was rejected by the non-negative balance invariant
    ///
    /// The enclosing transaction must be rolled back.
    #[error("Insufficient funds on account {account}: balance {balance}, attempted {attempted}")]
    InsufficientFunds {
        account: AccountId,
        balance: Decimal,
        attempted: Decimal,
    },

    /// Another open transaction holds a write intent on the row
    #[error("Account {account} is being written by another transaction")]
    RowBusy { account: AccountId },

    /// The row addressed by a write does not exist
    #[error("Account {account} not found")]
    AccountNotFound { account: AccountId },

    /// Accounts cannot be opened with a negative balance
    #[error("Opening balance {balance} is negative")]
    NegativeOpeningBalance { balance: Decimal },

    /// The version stamp cannot be incremented any further
    #[error("Version overflow on account {account}")]
    VersionOverflow { account: AccountId },

    /// Arithmetic overflow computing a new balance
    #[error("Balance overflow on account {account}")]
    BalanceOverflow { account: AccountId },

    /// The store cannot be reached or its state is unusable
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    pub fn insufficient_funds(account: AccountId, balance: Decimal, attempted: Decimal) -> Self {
        StoreError::InsufficientFunds {
            account,
            balance,
            attempted,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
        }
    }
}

/// Fatal errors of the transfer engine and its file pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransferError {
    /// Unexpected storage failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError { message: String },

    /// CSV input could not be parsed
    #[error("CSV parse error{}: {message}", .line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError { line: Option<u64>, message: String },

    /// The async runtime could not be started or a worker task failed
    #[error("Runtime error: {message}")]
    Runtime { message: String },
}

impl From<std::io::Error> for TransferError {
    fn from(error: std::io::Error) -> Self {
        TransferError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for TransferError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        TransferError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl From<csv_async::Error> for TransferError {
    fn from(error: csv_async::Error) -> Self {
        // the message already carries the record position
        TransferError::ParseError {
            line: None,
            message: error.to_string(),
        }
    }
}

impl TransferError {
    pub fn runtime(message: impl Into<String>) -> Self {
        TransferError::Runtime {
            message: message.into(),
        }
    }
}
