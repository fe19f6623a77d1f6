//! Catalog of running and finished transactions.

use crate::error::{CoreError, CoreResult};
use crate::transaction::log::{EventSequencer, TxnLog};
use crate::transaction::state::{Transaction, TransactionState};
use crate::types::TransactionId;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Number of transactions in each registry collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryCounts {
    /// Opened and not yet finished.
    pub running: usize,
    /// Committed.
    pub committed: usize,
    /// Aborted.
    pub aborted: usize,
}

#[derive(Debug, Default)]
struct RegistryInner {
    last_id: u64,
    running: BTreeSet<TransactionId>,
    committed: Vec<Transaction>,
    aborted: Vec<Transaction>,
}

/// Process-wide catalog of transactions.
///
/// A running transaction is owned by its worker; the registry only tracks
/// its id. When the transaction finishes, the worker files it here and it
/// becomes immutable history in the committed or aborted collection.
#[derive(Debug)]
pub struct TransactionRegistry {
    sequencer: Arc<EventSequencer>,
    inner: Mutex<RegistryInner>,
}

impl TransactionRegistry {
    /// Creates an empty registry. The first transaction gets id 1.
    pub fn new() -> Self {
        Self {
            sequencer: Arc::new(EventSequencer::new()),
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// Opens a new transaction with the next id and marks it running.
    pub fn open(&self) -> Transaction {
        let id = {
            let mut inner = self.inner.lock();
            inner.last_id += 1;
            let id = TransactionId::new(inner.last_id);
            inner.running.insert(id);
            id
        };
        Transaction::new(id, Arc::clone(&self.sequencer))
    }

    /// Moves a finished transaction from running to committed or aborted.
    ///
    /// Fails if the transaction is still active or is not running.
    pub(crate) fn file(&self, txn: Transaction) -> CoreResult<()> {
        let mut inner = self.inner.lock();
        if txn.is_active() {
            return Err(CoreError::invalid_operation(format!(
                "{} is still active",
                txn.id()
            )));
        }
        if !inner.running.remove(&txn.id()) {
            return Err(CoreError::invalid_operation(format!(
                "{} is not running",
                txn.id()
            )));
        }
        match txn.state() {
            TransactionState::Committed => inner.committed.push(txn),
            _ => inner.aborted.push(txn),
        }
        Ok(())
    }

    /// Returns how many transactions are in each collection.
    #[must_use]
    pub fn counts(&self) -> RegistryCounts {
        let inner = self.inner.lock();
        RegistryCounts {
            running: inner.running.len(),
            committed: inner.committed.len(),
            aborted: inner.aborted.len(),
        }
    }

    /// Returns the ids of running transactions in ascending order.
    #[must_use]
    pub fn running(&self) -> Vec<TransactionId> {
        self.inner.lock().running.iter().copied().collect()
    }

    /// Returns the ids of committed transactions in filing order.
    #[must_use]
    pub fn committed(&self) -> Vec<TransactionId> {
        self.inner.lock().committed.iter().map(Transaction::id).collect()
    }

    /// Returns the ids of aborted transactions in filing order.
    #[must_use]
    pub fn aborted(&self) -> Vec<TransactionId> {
        self.inner.lock().aborted.iter().map(Transaction::id).collect()
    }

    /// Returns the log of a finished transaction.
    #[must_use]
    pub fn log_of(&self, id: TransactionId) -> Option<TxnLog> {
        let inner = self.inner.lock();
        inner
            .committed
            .iter()
            .chain(inner.aborted.iter())
            .find(|txn| txn.id() == id)
            .map(|txn| txn.log().clone())
    }

    /// Returns the sequencer stamping every transaction's log.
    #[must_use]
    pub fn sequencer(&self) -> &Arc<EventSequencer> {
        &self.sequencer
    }
}

impl Default for TransactionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
