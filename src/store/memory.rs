//! In-memory transactional ledger
//!
//! `MemoryLedger` stands in for the relational store. It keeps one row per
//! account behind its own mutex and gives transactions row-level write
//! intents:
//!
//! - a write stages the new balance and claims the row for its transaction
//! - a second transaction cannot write a claimed row until the claim is
//!   released by commit or rollback
//! - commit locks every touched row in ascending id order and applies all
//!   staged writes before releasing any of them
//!
//! Readers outside a transaction only ever see committed rows, and never half
//! of a commit.

use super::invariant::NonNegativeBalance;
use super::traits::{BalanceWriteHook, LedgerStore, LedgerTransaction};
use crate::types::{Account, AccountId, Currency, StoreError, Version};
use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type TxId = u64;

#[derive(Debug)]
struct Row {
    /// Last committed state
    account: Account,

    /// Transaction currently holding the write intent
    writer: Option<TxId>,
}

fn lock_row(row: &Mutex<Row>) -> Result<MutexGuard<'_, Row>, StoreError> {
    row.lock()
        .map_err(|_| StoreError::unavailable("account row lock poisoned"))
}

struct LedgerState {
    rows: DashMap<AccountId, Arc<Mutex<Row>>>,
    next_account: AtomicU64,
    next_tx: AtomicU64,
    hooks: Vec<Arc<dyn BalanceWriteHook>>,
}

impl LedgerState {
    fn row(&self, id: AccountId) -> Option<Arc<Mutex<Row>>> {
        self.rows.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    fn run_hooks(
        &self,
        account: AccountId,
        old_balance: Decimal,
        new_balance: Decimal,
    ) -> Result<(), StoreError> {
        for hook in &self.hooks {
            hook.check(account, old_balance, new_balance)?;
        }
        Ok(())
    }
}

/// Thread-safe in-memory ledger with transactional writes
///
/// Cloning is cheap and yields a handle to the same ledger.
#[derive(Clone)]
pub struct MemoryLedger {
    state: Arc<LedgerState>,
}

impl MemoryLedger {
    /// Create an empty ledger guarded by [`NonNegativeBalance`]
    pub fn new() -> Self {
        Self::with_hooks(Vec::new())
    }

    /// Create an empty ledger with extra write hooks
    ///
    /// [`NonNegativeBalance`] always runs first and cannot be removed.
    pub fn with_hooks(extra: Vec<Arc<dyn BalanceWriteHook>>) -> Self {
        let mut hooks: Vec<Arc<dyn BalanceWriteHook>> = vec![Arc::new(NonNegativeBalance)];
        hooks.extend(extra);

        Self {
            state: Arc::new(LedgerState {
                rows: DashMap::new(),
                next_account: AtomicU64::new(1),
                next_tx: AtomicU64::new(1),
                hooks,
            }),
        }
    }

    fn insert(&self, currency: Currency, balance: Decimal, owner: &str) -> Result<Account, StoreError> {
        if balance < Decimal::ZERO {
            return Err(StoreError::NegativeOpeningBalance { balance });
        }

        let id = self.state.next_account.fetch_add(1, Ordering::SeqCst);
        let account = Account::new(id, currency, balance, owner);
        self.state.rows.insert(
            id,
            Arc::new(Mutex::new(Row {
                account: account.clone(),
                writer: None,
            })),
        );
        Ok(account)
    }

    fn read(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        match self.state.row(id) {
            Some(row) => Ok(Some(lock_row(&row)?.account.clone())),
            None => Ok(None),
        }
    }

    fn snapshot(&self) -> Result<Vec<Account>, StoreError> {
        let mut rows: Vec<(AccountId, Arc<Mutex<Row>>)> = self
            .state
            .rows
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        rows.sort_by_key(|(id, _)| *id);

        // Same ascending order as commit, so the snapshot never straddles one
        let guards = rows
            .iter()
            .map(|(_, row)| lock_row(row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(guards.iter().map(|guard| guard.account.clone()).collect())
    }

    fn open(&self) -> MemoryTransaction {
        MemoryTransaction {
            id: self.state.next_tx.fetch_add(1, Ordering::SeqCst),
            state: Arc::clone(&self.state),
            staged: BTreeMap::new(),
            finished: false,
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLedger")
            .field("accounts", &self.state.rows.len())
            .field("hooks", &self.state.hooks.len())
            .finish()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn create_account(
        &self,
        currency: Currency,
        balance: Decimal,
        owner: &str,
    ) -> Result<Account, StoreError> {
        self.insert(currency, balance, owner)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.read(id)
    }

    async fn accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.snapshot()
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, StoreError> {
        Ok(Box::new(self.open()))
    }
}

struct StagedWrite {
    row: Arc<Mutex<Row>>,
    balance: Decimal,
    version: Version,
}

/// Transaction over a [`MemoryLedger`]
///
/// Staged writes are kept in id order; that order is the lock order used by
/// commit.
pub struct MemoryTransaction {
    id: TxId,
    state: Arc<LedgerState>,
    staged: BTreeMap<AccountId, StagedWrite>,
    finished: bool,
}

impl MemoryTransaction {
    fn read(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let Some(row) = self.state.row(id) else {
            return Ok(None);
        };
        let mut account = lock_row(&row)?.account.clone();
        if let Some(write) = self.staged.get(&id) {
            account.balance = write.balance;
            account.version = write.version;
        }
        Ok(Some(account))
    }

    /// Balance and version as seen by this transaction
    fn current(&self, id: AccountId, row: &Row) -> (Decimal, Version) {
        match self.staged.get(&id) {
            Some(write) => (write.balance, write.version),
            None => (row.account.balance, row.account.version),
        }
    }

    fn stage(
        &mut self,
        id: AccountId,
        row: &Arc<Mutex<Row>>,
        guard: &mut Row,
        balance: Decimal,
        version: Version,
    ) {
        guard.writer = Some(self.id);
        self.staged.insert(
            id,
            StagedWrite {
                row: Arc::clone(row),
                balance,
                version,
            },
        );
    }

    fn write_if_version(
        &mut self,
        id: AccountId,
        new_balance: Decimal,
        expected_version: Version,
    ) -> Result<u64, StoreError> {
        let Some(row) = self.state.row(id) else {
            return Ok(0);
        };
        let mut guard = lock_row(&row)?;
        if guard.writer.is_some_and(|writer| writer != self.id) {
            return Ok(0);
        }

        let (old_balance, version) = self.current(id, &guard);
        if version != expected_version {
            return Ok(0);
        }
        self.state.run_hooks(id, old_balance, new_balance)?;
        let next = version
            .checked_add(1)
            .ok_or(StoreError::VersionOverflow { account: id })?;

        self.stage(id, &row, &mut guard, new_balance, next);
        Ok(1)
    }

    fn adjust(&mut self, id: AccountId, delta: Decimal) -> Result<(), StoreError> {
        let row = self
            .state
            .row(id)
            .ok_or(StoreError::AccountNotFound { account: id })?;
        let mut guard = lock_row(&row)?;
        if guard.writer.is_some_and(|writer| writer != self.id) {
            return Err(StoreError::RowBusy { account: id });
        }

        let (old_balance, version) = self.current(id, &guard);
        let new_balance = old_balance
            .checked_add(delta)
            .ok_or(StoreError::BalanceOverflow { account: id })?;
        self.state.run_hooks(id, old_balance, new_balance)?;
        let next = version
            .checked_add(1)
            .ok_or(StoreError::VersionOverflow { account: id })?;

        self.stage(id, &row, &mut guard, new_balance, next);
        Ok(())
    }

    fn apply(&mut self) -> Result<(), StoreError> {
        {
            let mut guards = Vec::with_capacity(self.staged.len());
            for write in self.staged.values() {
                guards.push((lock_row(&write.row)?, write));
            }
            for (guard, write) in guards.iter_mut() {
                guard.account.balance = write.balance;
                guard.account.version = write.version;
                guard.writer = None;
            }
        }
        self.staged.clear();
        self.finished = true;
        Ok(())
    }

    fn release(&mut self) {
        for (_, write) in std::mem::take(&mut self.staged) {
            // a poisoned row still has to give up its claim
            let mut guard = write.row.lock().unwrap_or_else(PoisonError::into_inner);
            if guard.writer == Some(self.id) {
                guard.writer = None;
            }
        }
        self.finished = true;
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            self.release();
        }
    }
}

#[async_trait]
impl LedgerTransaction for MemoryTransaction {
    async fn get_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.read(id)
    }

    async fn get_account_with_version(
        &mut self,
        id: AccountId,
    ) -> Result<Option<(Account, Version)>, StoreError> {
        Ok(self.read(id)?.map(|account| {
            let version = account.version;
            (account, version)
        }))
    }

    async fn conditional_update_balance(
        &mut self,
        id: AccountId,
        new_balance: Decimal,
        expected_version: Version,
    ) -> Result<u64, StoreError> {
        self.write_if_version(id, new_balance, expected_version)
    }

    async fn update_balance(&mut self, id: AccountId, delta: Decimal) -> Result<(), StoreError> {
        self.adjust(id, delta)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut tx = self;
        tx.apply()
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let mut tx = self;
        tx.release();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: i64) -> Decimal {
        Decimal::from(value)
    }

    async fn ledger_with(balances: &[i64]) -> MemoryLedger {
        let ledger = MemoryLedger::new();
        for (i, balance) in balances.iter().enumerate() {
            ledger
                .create_account(Currency::Usd, dec(*balance), &format!("owner-{}", i))
                .await
                .unwrap();
        }
        ledger
    }

    #[tokio::test]
    async fn test_create_account_assigns_sequential_ids() {
        let ledger = MemoryLedger::new();

        let first = ledger.create_account(Currency::Usd, dec(10), "a").await.unwrap();
        let second = ledger.create_account(Currency::Eur, dec(20), "b").await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(second.version, 0);
        assert_eq!(ledger.get_account(2).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_create_account_rejects_negative_opening_balance() {
        let ledger = MemoryLedger::new();

        let result = ledger.create_account(Currency::Usd, dec(-1), "a").await;

        assert_eq!(
            result,
            Err(StoreError::NegativeOpeningBalance { balance: dec(-1) })
        );
        assert!(ledger.accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_account_missing_returns_none() {
        let ledger = ledger_with(&[100]).await;
        assert_eq!(ledger.get_account(42).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_conditional_update_commits_and_bumps_version() {
        let ledger = ledger_with(&[100]).await;

        let mut tx = ledger.begin().await.unwrap();
        let (account, version) = tx.get_account_with_version(1).await.unwrap().unwrap();
        assert_eq!(account.balance, dec(100));
        assert_eq!(version, 0);

        let rows = tx.conditional_update_balance(1, dec(60), version).await.unwrap();
        assert_eq!(rows, 1);
        tx.commit().await.unwrap();

        let account = ledger.get_account(1).await.unwrap().unwrap();
        assert_eq!(account.balance, dec(60));
        assert_eq!(account.version, 1);
    }

    #[tokio::test]
    async fn test_conditional_update_with_stale_version_affects_no_rows() {
        let ledger = ledger_with(&[100]).await;

        let mut tx = ledger.begin().await.unwrap();
        let rows = tx.conditional_update_balance(1, dec(60), 7).await.unwrap();

        assert_eq!(rows, 0);
        tx.rollback().await.unwrap();
        assert_eq!(ledger.get_account(1).await.unwrap().unwrap().version, 0);
    }

    #[tokio::test]
    async fn test_conditional_update_on_missing_row_affects_no_rows() {
        let ledger = ledger_with(&[100]).await;

        let mut tx = ledger.begin().await.unwrap();
        assert_eq!(tx.conditional_update_balance(9, dec(1), 0).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_second_writer_from_same_snapshot_loses() {
        let ledger = ledger_with(&[100]).await;

        let mut first = ledger.begin().await.unwrap();
        let mut second = ledger.begin().await.unwrap();
        let (_, v1) = first.get_account_with_version(1).await.unwrap().unwrap();
        let (_, v2) = second.get_account_with_version(1).await.unwrap().unwrap();
        assert_eq!(v1, v2);

        assert_eq!(first.conditional_update_balance(1, dec(70), v1).await.unwrap(), 1);
        assert_eq!(second.conditional_update_balance(1, dec(50), v2).await.unwrap(), 0);
        first.commit().await.unwrap();
        second.rollback().await.unwrap();

        // once the winner has committed, the loser's snapshot is stale for good
        let mut retry = ledger.begin().await.unwrap();
        assert_eq!(retry.conditional_update_balance(1, dec(50), v2).await.unwrap(), 0);
        let (account, fresh) = retry.get_account_with_version(1).await.unwrap().unwrap();
        assert_eq!(account.balance, dec(70));
        assert_eq!(retry.conditional_update_balance(1, dec(50), fresh).await.unwrap(), 1);
        retry.commit().await.unwrap();

        let account = ledger.get_account(1).await.unwrap().unwrap();
        assert_eq!(account.balance, dec(50));
        assert_eq!(account.version, 2);
    }

    #[tokio::test]
    async fn test_staged_writes_invisible_until_commit() {
        let ledger = ledger_with(&[100, 0]).await;

        let mut tx = ledger.begin().await.unwrap();
        tx.update_balance(1, dec(-40)).await.unwrap();
        tx.update_balance(2, dec(40)).await.unwrap();

        // own writes are visible inside the transaction
        assert_eq!(tx.get_account(1).await.unwrap().unwrap().balance, dec(60));
        // but not outside it
        assert_eq!(ledger.get_account(1).await.unwrap().unwrap().balance, dec(100));
        assert_eq!(ledger.get_account(2).await.unwrap().unwrap().balance, dec(0));

        tx.commit().await.unwrap();

        let accounts = ledger.accounts().await.unwrap();
        assert_eq!(accounts[0].balance, dec(60));
        assert_eq!(accounts[1].balance, dec(40));
        assert_eq!(accounts[0].version, 1);
        assert_eq!(accounts[1].version, 1);
    }

    #[tokio::test]
    async fn test_rollback_discards_writes_and_releases_rows() {
        let ledger = ledger_with(&[100, 0]).await;

        let mut tx = ledger.begin().await.unwrap();
        tx.update_balance(1, dec(-40)).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(ledger.get_account(1).await.unwrap().unwrap().balance, dec(100));
        let mut next = ledger.begin().await.unwrap();
        assert!(next.update_balance(1, dec(-10)).await.is_ok());
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let ledger = ledger_with(&[100]).await;

        {
            let mut tx = ledger.begin().await.unwrap();
            tx.update_balance(1, dec(-40)).await.unwrap();
        }

        assert_eq!(ledger.get_account(1).await.unwrap().unwrap().balance, dec(100));
        let mut next = ledger.begin().await.unwrap();
        assert_eq!(next.conditional_update_balance(1, dec(1), 0).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_balance_on_claimed_row_is_busy() {
        let ledger = ledger_with(&[100]).await;

        let mut holder = ledger.begin().await.unwrap();
        holder.update_balance(1, dec(5)).await.unwrap();

        let mut other = ledger.begin().await.unwrap();
        assert_eq!(
            other.update_balance(1, dec(5)).await,
            Err(StoreError::RowBusy { account: 1 })
        );
    }

    #[tokio::test]
    async fn test_update_balance_on_missing_row_fails() {
        let ledger = ledger_with(&[]).await;

        let mut tx = ledger.begin().await.unwrap();
        assert_eq!(
            tx.update_balance(3, dec(5)).await,
            Err(StoreError::AccountNotFound { account: 3 })
        );
    }

    #[tokio::test]
    async fn test_invariant_fires_on_unconditional_write() {
        let ledger = ledger_with(&[50]).await;

        let mut tx = ledger.begin().await.unwrap();
        let result = tx.update_balance(1, dec(-51)).await;

        assert_eq!(
            result,
            Err(StoreError::InsufficientFunds {
                account: 1,
                balance: dec(50),
                attempted: dec(-1),
            })
        );
        tx.rollback().await.unwrap();
        assert_eq!(ledger.get_account(1).await.unwrap().unwrap().balance, dec(50));
    }

    #[tokio::test]
    async fn test_invariant_fires_on_conditional_write() {
        let ledger = ledger_with(&[50]).await;

        let mut tx = ledger.begin().await.unwrap();
        let result = tx.conditional_update_balance(1, dec(-10), 0).await;

        assert!(matches!(result, Err(StoreError::InsufficientFunds { account: 1, .. })));
    }

    #[tokio::test]
    async fn test_extra_hooks_run_after_invariant() {
        struct CapAt(Decimal);

        impl BalanceWriteHook for CapAt {
            fn check(&self, account: AccountId, _old: Decimal, new: Decimal) -> Result<(), StoreError> {
                if new > self.0 {
                    return Err(StoreError::unavailable(format!("cap exceeded on {}", account)));
                }
                Ok(())
            }
        }

        let cap: Arc<dyn BalanceWriteHook> = Arc::new(CapAt(dec(150)));
        let ledger = MemoryLedger::with_hooks(vec![cap]);
        ledger.create_account(Currency::Usd, dec(100), "a").await.unwrap();

        let mut tx = ledger.begin().await.unwrap();
        assert!(tx.update_balance(1, dec(40)).await.is_ok());
        assert!(tx.update_balance(1, dec(40)).await.is_err());
    }

    #[test]
    fn test_concurrent_commits_keep_rows_consistent() {
        use std::thread;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .build()
            .unwrap();
        let ledger = runtime.block_on(ledger_with(&[1000, 1000]));

        let mut handles = vec![];
        for i in 0..8 {
            let ledger = ledger.clone();
            handles.push(thread::spawn(move || {
                let mut moved = 0;
                for _ in 0..50 {
                    let mut tx = ledger.open();
                    let (from, to) = if i % 2 == 0 { (1, 2) } else { (2, 1) };
                    let ok = tx.adjust(from, dec(-1)).is_ok() && tx.adjust(to, dec(1)).is_ok();
                    if ok && tx.apply().is_ok() {
                        moved += 1;
                    }
                }
                moved
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let accounts = ledger.snapshot().unwrap();
        assert_eq!(accounts[0].balance + accounts[1].balance, dec(2000));
        assert_eq!(accounts[0].version, accounts[1].version);
    }
}
