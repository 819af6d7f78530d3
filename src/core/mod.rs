//! Core business logic module
//!
//! This module contains the transfer engine components:
//! - `engine` - Transfer orchestration over a pluggable concurrency strategy
//! - `validation` - Ordered transfer preconditions
//! - `lock_coordinator` - Weak per-account lock pool for the pessimistic strategy
//! - `batch_processor` - Concurrent execution of request batches

pub mod batch_processor;
pub mod engine;
pub mod lock_coordinator;
pub mod validation;

pub use batch_processor::{BatchProcessor, BatchSummary, TransferReport};
pub use engine::TransferEngine;
pub use lock_coordinator::{LockCoordinator, LockGuard};
pub use validation::ValidTransfer;
