//! Lock table.

use crate::error::{CoreError, CoreResult};
use crate::lock::{Lock, LockMode, LockSnapshot};
use crate::transaction::{Transaction, TxnEventKind};
use crate::types::AccountId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Owns one [`Lock`] per account.
///
/// Locks are created on first request and live as long as the table.
#[derive(Debug, Default)]
pub struct LockTable {
    locks: Mutex<HashMap<AccountId, Arc<Lock>>>,
}

impl LockTable {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock on `account` for `txn` in `mode`.
    ///
    /// Blocks while the request conflicts with other holders. Fails with
    /// [`CoreError::Aborted`] when waiting could deadlock; the caller must then
    /// roll back and release the transaction.
    pub fn acquire(
        &self,
        txn: &mut Transaction,
        account: AccountId,
        mode: LockMode,
    ) -> CoreResult<()> {
        txn.ensure_active()?;
        if mode == LockMode::None {
            return Err(CoreError::invalid_operation("cannot request an empty lock"));
        }

        let lock = self.get_or_create(account);
        lock.acquire(txn, mode)?;
        txn.add_lock(lock);
        Ok(())
    }

    /// Releases every lock `txn` holds and wakes their waiters.
    ///
    /// Calling it again releases nothing. Returns the number of locks released.
    pub fn release(&self, txn: &mut Transaction) -> usize {
        let locks = txn.take_locks();
        for lock in &locks {
            lock.release(txn.id());
        }
        if !locks.is_empty() {
            txn.record(TxnEventKind::Unlocked { locks: locks.len() });
        }
        locks.len()
    }

    /// Returns a view of the lock on `account`, if one was ever requested.
    #[must_use]
    pub fn snapshot(&self, account: AccountId) -> Option<LockSnapshot> {
        let lock = self.locks.lock().get(&account).cloned();
        lock.map(|lock| lock.snapshot())
    }

    /// Returns the number of locks created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    /// Returns true if no lock was ever requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }

    fn get_or_create(&self, account: AccountId) -> Arc<Lock> {
        let mut locks = self.locks.lock();
        Arc::clone(
            locks
                .entry(account)
                .or_insert_with(|| Arc::new(Lock::new(account))),
        )
    }
}
