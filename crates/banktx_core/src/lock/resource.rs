//! Per-account lock.

use crate::error::{CoreError, CoreResult};
use crate::lock::LockMode;
use crate::transaction::{Transaction, TxnEventKind};
use crate::types::{AccountId, TransactionId};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Mutable part of a lock, guarded by the lock's mutex.
#[derive(Debug)]
struct LockState {
    mode: LockMode,
    /// Holding transactions in acquisition order.
    holders: Vec<TransactionId>,
    /// Sleeping requesters and the mode each asked for.
    waiters: HashMap<TransactionId, LockMode>,
}

impl LockState {
    /// Returns true if `txn` may not be granted `mode` right now.
    fn is_conflict(&self, txn: TransactionId, mode: LockMode) -> bool {
        if self.holders.is_empty() {
            return false;
        }
        if self.holders.len() == 1 && self.holders[0] == txn {
            return false;
        }
        match mode {
            // A WRITE lock always has a single holder, and it is not `txn` here.
            LockMode::Read => self.mode == LockMode::Write,
            LockMode::Write | LockMode::None => true,
        }
    }

    fn grant(&mut self, txn: TransactionId, mode: LockMode) {
        if !self.holders.contains(&txn) {
            self.holders.push(txn);
        }
        self.mode = self.mode.promote(mode);
    }
}

/// Point-in-time view of a lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockSnapshot {
    /// The protected account.
    pub account: AccountId,
    /// Current mode.
    pub mode: LockMode,
    /// Holders in acquisition order.
    pub holders: Vec<TransactionId>,
    /// Waiting transactions and their requested modes, ordered by id.
    pub waiters: Vec<(TransactionId, LockMode)>,
}

/// Lock protecting a single account.
///
/// Requesters that conflict with the current holders sleep on the lock's
/// condition variable and re-check when any holder releases.
///
/// Deadlocks are avoided with a conservative rule instead of cycle detection:
/// a transaction that would have to wait is aborted if any lock it already
/// holds has waiters of its own. No transaction can then sit in a wait-for
/// cycle, at the price of aborting some transactions that would not have
/// deadlocked.
#[derive(Debug)]
pub struct Lock {
    account: AccountId,
    state: Mutex<LockState>,
    released: Condvar,
    /// Number of waiters, readable without taking `state`.
    waiting: AtomicUsize,
    /// Current mode, readable without taking `state`.
    mode_hint: AtomicU8,
}

impl Lock {
    /// Creates an unheld lock for an account.
    pub fn new(account: AccountId) -> Self {
        Self {
            account,
            state: Mutex::new(LockState {
                mode: LockMode::None,
                holders: Vec::new(),
                waiters: HashMap::new(),
            }),
            released: Condvar::new(),
            waiting: AtomicUsize::new(0),
            mode_hint: AtomicU8::new(LockMode::None.to_code()),
        }
    }

    /// Returns the protected account.
    #[must_use]
    pub fn account(&self) -> AccountId {
        self.account
    }

    /// Returns the current mode.
    #[must_use]
    pub fn mode(&self) -> LockMode {
        self.state.lock().mode
    }

    /// Returns a consistent view of holders and waiters.
    #[must_use]
    pub fn snapshot(&self) -> LockSnapshot {
        let state = self.state.lock();
        let mut waiters: Vec<_> = state.waiters.iter().map(|(&t, &m)| (t, m)).collect();
        waiters.sort_by_key(|(t, _)| *t);
        LockSnapshot {
            account: self.account,
            mode: state.mode,
            holders: state.holders.clone(),
            waiters,
        }
    }

    /// Acquires this lock for `txn` in `mode`, blocking while it conflicts.
    ///
    /// Returns [`CoreError::Aborted`] instead of waiting when one of the
    /// locks `txn` already holds has waiters.
    pub(crate) fn acquire(&self, txn: &mut Transaction, mode: LockMode) -> CoreResult<()> {
        let id = txn.id();
        let account = self.account;
        txn.record(TxnEventKind::LockRequested { account, mode });

        let mut state = self.state.lock();
        while state.is_conflict(id, mode) {
            // Register before inspecting held locks: of two transactions that
            // each wait on a lock the other holds, the later one to register
            // sees the earlier one's registration and aborts.
            state.waiters.insert(id, mode);
            self.waiting.fetch_add(1, Ordering::SeqCst);

            if let Some((held_account, held_mode)) = self.held_lock_with_waiters(txn) {
                state.waiters.remove(&id);
                self.waiting.fetch_sub(1, Ordering::SeqCst);
                drop(state);

                txn.record(TxnEventKind::LockAborted {
                    account,
                    mode,
                    held_account,
                    held_mode,
                });
                debug!(%id, %account, %mode, held = %held_account, "lock request aborted");
                return Err(CoreError::aborted(
                    id,
                    account,
                    format!("{held_mode} on {held_account} has waiters"),
                ));
            }

            txn.record(TxnEventKind::LockWaiting { account, mode });
            debug!(%id, %account, %mode, "waiting for lock");
            self.released.wait(&mut state);

            state.waiters.remove(&id);
            self.waiting.fetch_sub(1, Ordering::SeqCst);
            txn.record(TxnEventKind::LockWoke { account, mode });
            debug!(%id, %account, %mode, "woke up");
        }

        state.grant(id, mode);
        let granted = state.mode;
        self.mode_hint.store(granted.to_code(), Ordering::SeqCst);
        drop(state);

        txn.record(TxnEventKind::LockGranted {
            account,
            mode: granted,
        });
        Ok(())
    }

    /// Removes `txn` from the holders and wakes every waiter.
    ///
    /// Returns false if `txn` was not a holder.
    pub(crate) fn release(&self, txn: TransactionId) -> bool {
        let mut state = self.state.lock();
        let Some(pos) = state.holders.iter().position(|&h| h == txn) else {
            return false;
        };
        state.holders.remove(pos);
        if state.holders.is_empty() {
            state.mode = LockMode::None;
        }
        self.mode_hint.store(state.mode.to_code(), Ordering::SeqCst);
        self.released.notify_all();
        true
    }

    /// Finds a lock held by `txn` that some other transaction waits on.
    ///
    /// Only atomics of other locks are read, so no second mutex is taken
    /// while this lock's mutex is held.
    fn held_lock_with_waiters(&self, txn: &Transaction) -> Option<(AccountId, LockMode)> {
        txn.locks()
            .iter()
            .find(|held| {
                let own = usize::from(std::ptr::eq(Arc::as_ptr(held), self));
                held.waiting.load(Ordering::SeqCst) > own
            })
            .map(|held| (held.account, held.mode_hint()))
    }

    fn mode_hint(&self) -> LockMode {
        LockMode::from_code(self.mode_hint.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::EventSequencer;
    use std::thread;
    use std::time::Duration;

    fn txn(id: u64) -> Transaction {
        Transaction::new(TransactionId::new(id), Arc::new(EventSequencer::new()))
    }

    fn wait_for_waiters(lock: &Lock, count: usize) {
        for _ in 0..500 {
            if lock.snapshot().waiters.len() == count {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("expected {count} waiter(s) on {}", lock.account());
    }

    #[test]
    fn free_lock_is_granted() {
        let lock = Lock::new(AccountId::new(1));
        let mut t1 = txn(1);

        lock.acquire(&mut t1, LockMode::Write).unwrap();

        let snap = lock.snapshot();
        assert_eq!(snap.mode, LockMode::Write);
        assert_eq!(snap.holders, vec![TransactionId::new(1)]);
    }

    #[test]
    fn readers_share() {
        let lock = Lock::new(AccountId::new(1));
        let mut t1 = txn(1);
        let mut t2 = txn(2);

        lock.acquire(&mut t1, LockMode::Read).unwrap();
        lock.acquire(&mut t2, LockMode::Read).unwrap();

        let snap = lock.snapshot();
        assert_eq!(snap.mode, LockMode::Read);
        assert_eq!(snap.holders, vec![TransactionId::new(1), TransactionId::new(2)]);
    }

    #[test]
    fn sole_reader_is_promoted_in_place() {
        let lock = Lock::new(AccountId::new(1));
        let mut t1 = txn(1);

        lock.acquire(&mut t1, LockMode::Read).unwrap();
        lock.acquire(&mut t1, LockMode::Write).unwrap();
        lock.acquire(&mut t1, LockMode::Read).unwrap();

        let snap = lock.snapshot();
        assert_eq!(snap.mode, LockMode::Write);
        assert_eq!(snap.holders, vec![TransactionId::new(1)]);
    }

    #[test]
    fn release_resets_mode_and_is_idempotent() {
        let lock = Lock::new(AccountId::new(1));
        let mut t1 = txn(1);
        lock.acquire(&mut t1, LockMode::Write).unwrap();

        assert!(lock.release(TransactionId::new(1)));
        assert!(!lock.release(TransactionId::new(1)));
        assert_eq!(lock.mode(), LockMode::None);
        assert!(lock.snapshot().holders.is_empty());
    }

    #[test]
    fn writer_blocks_until_reader_releases() {
        let lock = Arc::new(Lock::new(AccountId::new(1)));
        let mut t1 = txn(1);
        lock.acquire(&mut t1, LockMode::Read).unwrap();

        let waiter = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                let mut t2 = txn(2);
                lock.acquire(&mut t2, LockMode::Write).map(|_| t2)
            })
        };

        wait_for_waiters(&lock, 1);
        assert_eq!(
            lock.snapshot().waiters,
            vec![(TransactionId::new(2), LockMode::Write)]
        );

        lock.release(TransactionId::new(1));
        let t2 = waiter.join().unwrap().unwrap();

        let snap = lock.snapshot();
        assert_eq!(snap.mode, LockMode::Write);
        assert_eq!(snap.holders, vec![TransactionId::new(2)]);
        assert!(snap.waiters.is_empty());
        assert!(t2
            .log()
            .events()
            .iter()
            .any(|e| matches!(e.kind, TxnEventKind::LockWaiting { .. })));
    }

    #[test]
    fn reader_waits_for_writer() {
        let lock = Arc::new(Lock::new(AccountId::new(1)));
        let mut t1 = txn(1);
        lock.acquire(&mut t1, LockMode::Write).unwrap();

        let waiter = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                let mut t2 = txn(2);
                lock.acquire(&mut t2, LockMode::Read)
            })
        };

        wait_for_waiters(&lock, 1);
        assert_eq!(lock.snapshot().holders, vec![TransactionId::new(1)]);

        lock.release(TransactionId::new(1));
        waiter.join().unwrap().unwrap();
        assert_eq!(lock.snapshot().holders, vec![TransactionId::new(2)]);
        assert_eq!(lock.mode(), LockMode::Read);
    }

    #[test]
    fn request_aborts_when_held_lock_has_waiters() {
        let a = Arc::new(Lock::new(AccountId::new(1)));
        let b = Arc::new(Lock::new(AccountId::new(2)));

        // t1 holds WRITE on a; t2 holds WRITE on b.
        let mut t1 = txn(1);
        a.acquire(&mut t1, LockMode::Write).unwrap();
        t1.add_lock(Arc::clone(&a));
        let mut t2 = txn(2);
        b.acquire(&mut t2, LockMode::Write).unwrap();
        t2.add_lock(Arc::clone(&b));

        // t2 blocks on a.
        let blocked = {
            let a = Arc::clone(&a);
            thread::spawn(move || {
                let result = a.acquire(&mut t2, LockMode::Read);
                (result, t2)
            })
        };
        wait_for_waiters(&a, 1);

        // t1 now asks for b while someone waits on a: t1 is aborted, not t2.
        let err = b.acquire(&mut t1, LockMode::Read).unwrap_err();
        assert!(err.is_aborted());
        assert!(b.snapshot().waiters.is_empty());
        assert!(t1
            .log()
            .events()
            .iter()
            .any(|e| matches!(e.kind, TxnEventKind::LockAborted { .. })));

        // Releasing t1's lock lets t2 through.
        a.release(TransactionId::new(1));
        let (result, _t2) = blocked.join().unwrap();
        result.unwrap();
        assert_eq!(a.snapshot().holders, vec![TransactionId::new(2)]);
    }

    #[test]
    fn competing_upgrades_abort_the_second() {
        let lock = Arc::new(Lock::new(AccountId::new(1)));
        let mut t1 = txn(1);
        let mut t2 = txn(2);
        lock.acquire(&mut t1, LockMode::Read).unwrap();
        t1.add_lock(Arc::clone(&lock));
        lock.acquire(&mut t2, LockMode::Read).unwrap();
        t2.add_lock(Arc::clone(&lock));

        let upgrader = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || lock.acquire(&mut t1, LockMode::Write))
        };
        wait_for_waiters(&lock, 1);

        // t2 holds the lock t1 waits on, so its own upgrade is refused.
        assert!(lock.acquire(&mut t2, LockMode::Write).unwrap_err().is_aborted());

        lock.release(TransactionId::new(2));
        upgrader.join().unwrap().unwrap();
        let snap = lock.snapshot();
        assert_eq!(snap.mode, LockMode::Write);
        assert_eq!(snap.holders, vec![TransactionId::new(1)]);
    }
}
