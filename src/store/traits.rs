//! Ledger store boundary
//!
//! These traits are the only way the engine touches account rows. A store
//! implementation must run every registered [`BalanceWriteHook`] on every
//! balance write, whichever method issued it.

use crate::types::{Account, AccountId, Currency, StoreError, Version};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Write-time check run by the store before a balance write is staged
///
/// Returning an error aborts the write; the caller is expected to roll back
/// the enclosing transaction.
pub trait BalanceWriteHook: Send + Sync {
    fn check(
        &self,
        account: AccountId,
        old_balance: Decimal,
        new_balance: Decimal,
    ) -> Result<(), StoreError>;
}

/// Shared, transactional account ledger
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a new account and return the stored row
    async fn create_account(
        &self,
        currency: Currency,
        balance: Decimal,
        owner: &str,
    ) -> Result<Account, StoreError>;

    /// Read a committed account
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Consistent snapshot of every committed account, sorted by id
    async fn accounts(&self) -> Result<Vec<Account>, StoreError>;

    /// Start a transaction scope
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, StoreError>;
}

/// Atomic unit of work against a [`LedgerStore`]
///
/// Writes are invisible to other readers until [`commit`](Self::commit).
/// Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Read an account as seen by this transaction
    async fn get_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Read an account together with the version the read observed
    async fn get_account_with_version(
        &mut self,
        id: AccountId,
    ) -> Result<Option<(Account, Version)>, StoreError>;

    /// Write `new_balance` only if the row is still at `expected_version`
    ///
    /// Returns the number of rows affected: 1 on success, 0 when the version
    /// is stale or another transaction is already writing the row.
    async fn conditional_update_balance(
        &mut self,
        id: AccountId,
        new_balance: Decimal,
        expected_version: Version,
    ) -> Result<u64, StoreError>;

    /// Adjust the balance by `delta` without a version check
    ///
    /// Only safe while the caller holds exclusive access to the account.
    async fn update_balance(&mut self, id: AccountId, delta: Decimal) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
