//! Ledger store module
//!
//! The store boundary consumed by the transfer engine:
//! - `traits` - `LedgerStore`, `LedgerTransaction` and `BalanceWriteHook`
//! - `memory` - Transactional in-memory ledger with row-level write intents
//! - `invariant` - Non-negative balance check fired on every balance write

pub mod invariant;
pub mod memory;
pub mod traits;

pub use invariant::NonNegativeBalance;
pub use memory::{MemoryLedger, MemoryTransaction};
pub use traits::{BalanceWriteHook, LedgerStore, LedgerTransaction};
