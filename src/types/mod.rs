//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account record, identifiers and currencies
//! - `transfer`: Transfer requests, canonical pairs and outcomes
//! - `error`: Store and fatal error types

pub mod account;
pub mod error;
pub mod transfer;

pub use account::{Account, AccountId, Currency, Version};
pub use error::{StoreError, TransferError};
pub use transfer::{AccountPair, TransferOutcome, TransferReceipt, TransferRequest};
