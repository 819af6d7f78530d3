//! Rust Transfer Engine Library
//! # Overview
//!
//! This library moves money between ledger accounts under concurrent load.
//! Every transfer is atomic: both balances change together or neither does,
//! and no committed balance is ever driven below zero by a debit.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Account, TransferRequest, TransferOutcome, errors)
//! - [`store`] - Ledger store boundary, the in-memory transactional ledger and
//!   the non-negative balance check applied to every write
//! - [`strategy`] - Interchangeable concurrency control for the write path:
//!   - [`strategy::lock`] - Per-account locks taken in ascending id order
//!   - [`strategy::optimistic`] - Version-checked writes reporting `Conflict`
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - Transfer orchestration and bounded retry
//!   - [`core::validation`] - Ordered transfer preconditions
//!   - [`core::lock_coordinator`] - Weak per-account lock pool
//!   - [`core::batch_processor`] - Concurrent batch execution
//! - [`io`] - CSV formats and the async transfer reader
//! - [`pipeline`], [`config`], [`logging`], [`cli`] - The file-driven binary
//!
//! # Outcomes
//!
//! Every transfer ends in exactly one [`TransferOutcome`]:
//!
//! - **Success**: both accounts updated, receipt carries their new state
//! - **InvalidRequest**: non-positive or missing amount, zero or equal ids
//! - **RecipientNotFound** / **SenderNotFound**: unknown account
//! - **CurrencyMismatch**: accounts hold different currencies
//! - **InsufficientFunds**: debit would take the sender below zero
//! - **Conflict**: a concurrent writer won; nothing was changed

pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod store;
pub mod strategy;
pub mod types;

pub use config::{BatchConfig, RetryPolicy};
pub use crate::core::{BatchProcessor, LockCoordinator, TransferEngine};
pub use pipeline::{PipelineSummary, TransferPipeline};
pub use store::{LedgerStore, LedgerTransaction, MemoryLedger, NonNegativeBalance};
pub use strategy::{
    create_strategy, create_strategy_with, ConcurrencyStrategy, LockStrategy, OptimisticStrategy,
};
pub use types::{
    Account, AccountId, Currency, StoreError, TransferError, TransferOutcome, TransferReceipt,
    TransferRequest,
};
