//! Transaction state.

use crate::error::{CoreError, CoreResult};
use crate::lock::Lock;
use crate::transaction::log::{EventSequencer, TxnEventKind, TxnLog};
use crate::types::{AccountId, Balance, TransactionId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been aborted and rolled back.
    Aborted,
}

/// A client session's transaction.
///
/// A transaction is owned by exactly one connection worker for its whole
/// life. It tracks the locks it holds, the before-image of every account it
/// touched, and an append-only event log.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    state: TransactionState,
    /// Locks held, in acquisition order. A lock appears at most once.
    locks: Vec<Arc<Lock>>,
    /// account -> balance before this transaction first touched it.
    before_image: BTreeMap<AccountId, Balance>,
    log: TxnLog,
    sequencer: Arc<EventSequencer>,
}

impl Transaction {
    /// Creates a new active transaction.
    pub(crate) fn new(id: TransactionId, sequencer: Arc<EventSequencer>) -> Self {
        let mut txn = Self {
            id,
            state: TransactionState::Active,
            locks: Vec::new(),
            before_image: BTreeMap::new(),
            log: TxnLog::new(id),
            sequencer,
        };
        txn.record(TxnEventKind::Opened);
        txn
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Returns the locks held, in acquisition order.
    #[must_use]
    pub fn locks(&self) -> &[Arc<Lock>] {
        &self.locks
    }

    /// Records a lock as held. Adding a lock already held is a no-op.
    pub(crate) fn add_lock(&mut self, lock: Arc<Lock>) {
        if !self.locks.iter().any(|held| Arc::ptr_eq(held, &lock)) {
            self.locks.push(lock);
        }
    }

    /// Forgets every held lock, returning them.
    pub(crate) fn take_locks(&mut self) -> Vec<Arc<Lock>> {
        std::mem::take(&mut self.locks)
    }

    /// Records the balance an account had before this transaction touched it.
    ///
    /// Only the first call per account counts; later calls are ignored so that
    /// rollback restores the pre-transaction state. Returns true if recorded.
    pub fn add_before_image(&mut self, account: AccountId, balance: Balance) -> bool {
        if self.before_image.contains_key(&account) {
            return false;
        }
        self.before_image.insert(account, balance);
        self.record(TxnEventKind::BeforeImage { account, balance });
        true
    }

    /// Returns the before-image, ordered by account.
    #[must_use]
    pub fn before_image(&self) -> &BTreeMap<AccountId, Balance> {
        &self.before_image
    }

    /// Appends an event to the log.
    pub fn record(&mut self, kind: TxnEventKind) {
        let seq = self.sequencer.next();
        self.log.push(seq, kind);
    }

    /// Returns the event log.
    #[must_use]
    pub fn log(&self) -> &TxnLog {
        &self.log
    }

    /// Marks the transaction as committed.
    pub(crate) fn mark_committed(&mut self) {
        self.state = TransactionState::Committed;
        self.record(TxnEventKind::Committed);
    }

    /// Marks the transaction as aborted.
    pub(crate) fn mark_aborted(&mut self) {
        self.state = TransactionState::Aborted;
        self.record(TxnEventKind::Aborted);
    }

    /// Ensures the transaction is active.
    pub(crate) fn ensure_active(&self) -> CoreResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Committed => Err(CoreError::invalid_operation(format!(
                "{} already committed",
                self.id
            ))),
            TransactionState::Aborted => Err(CoreError::invalid_operation(format!(
                "{} already aborted",
                self.id
            ))),
        }
    }
}
