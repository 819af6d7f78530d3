//! Per-account lock pool for the pessimistic strategy
//!
//! The coordinator hands out one async mutex per account id. Handles are
//! created on first use and held weakly by the pool, so an entry lives only
//! while some transfer holds or awaits it.
//!
//! # Lock scope
//!
//! A transfer locks every account it touches, not the pair as a unit. Two
//! transfers A→B and A→C therefore serialize on A. Ids are always locked in
//! ascending order, which rules out circular waits between any set of
//! concurrent transfers.

use crate::types::AccountId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::{Arc, OnceLock, Weak};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Pool of per-account mutual-exclusion handles
#[derive(Debug, Default)]
pub struct LockCoordinator {
    locks: DashMap<AccountId, Weak<Mutex<()>>>,
}

static SHARED: OnceLock<Arc<LockCoordinator>> = OnceLock::new();

impl LockCoordinator {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Process-wide coordinator, created on first call and never reset
    pub fn shared() -> Arc<LockCoordinator> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(LockCoordinator::new())))
    }

    /// Lock every id in `ids`, in ascending order
    ///
    /// Duplicates are ignored. The returned guard releases all handles when
    /// dropped.
    pub async fn acquire(self: &Arc<Self>, ids: &[AccountId]) -> LockGuard {
        let mut ordered = ids.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        // built up front so that a cancelled acquisition still evicts
        let mut held = LockGuard {
            coordinator: Arc::clone(self),
            guards: Vec::with_capacity(ordered.len()),
            ids: ordered,
        };
        for index in 0..held.ids.len() {
            // the map entry is released before awaiting
            let handle = self.handle(held.ids[index]);
            let guard = handle.lock_owned().await;
            held.guards.push(guard);
        }

        held
    }

    /// Number of entries currently in the pool
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Atomic get-or-create of the handle for `id`
    fn handle(&self, id: AccountId) -> Arc<Mutex<()>> {
        match self.locks.entry(id) {
            Entry::Occupied(mut entry) => match entry.get().upgrade() {
                Some(handle) => handle,
                None => {
                    let handle = Arc::new(Mutex::new(()));
                    entry.insert(Arc::downgrade(&handle));
                    handle
                }
            },
            Entry::Vacant(entry) => {
                let handle = Arc::new(Mutex::new(()));
                entry.insert(Arc::downgrade(&handle));
                handle
            }
        }
    }

    fn evict(&self, ids: &[AccountId]) {
        for id in ids {
            self.locks
                .remove_if(id, |_, handle| handle.strong_count() == 0);
        }
    }
}

/// Exclusive hold on a set of accounts
///
/// Dropping the guard unlocks every account and evicts pool entries no other
/// caller still references.
#[derive(Debug)]
pub struct LockGuard {
    coordinator: Arc<LockCoordinator>,
    ids: Vec<AccountId>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl LockGuard {
    /// Locked ids in acquisition order
    pub fn ids(&self) -> &[AccountId] {
        &self.ids
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // guards hold the strong references; drop them before evicting
        self.guards.clear();
        self.coordinator.evict(&self.ids);
    }
}
