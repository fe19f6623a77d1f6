//! Structured per-transaction activity log.

use crate::lock::LockMode;
use crate::types::{AccountId, Balance, TransactionId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// Process-wide sequence generator stamping log events.
///
/// A single sequencer is shared by every transaction of an engine, so event
/// sequence numbers give the cross-transaction order in which things happened.
#[derive(Debug)]
pub struct EventSequencer {
    next: AtomicU64,
}

impl EventSequencer {
    /// Creates a sequencer whose first stamp is 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns the next sequence number.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Returns how many stamps have been issued.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::SeqCst) - 1
    }
}

impl Default for EventSequencer {
    fn default() -> Self {
        Self::new()
    }
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnEventKind {
    /// The transaction was opened.
    Opened,
    /// A lock was requested.
    LockRequested {
        /// Account to lock.
        account: AccountId,
        /// Requested mode.
        mode: LockMode,
    },
    /// The request conflicted and the transaction went to sleep.
    LockWaiting {
        /// Account to lock.
        account: AccountId,
        /// Requested mode.
        mode: LockMode,
    },
    /// The transaction woke up and re-checks its request.
    LockWoke {
        /// Account to lock.
        account: AccountId,
        /// Requested mode.
        mode: LockMode,
    },
    /// The lock was granted.
    LockGranted {
        /// Locked account.
        account: AccountId,
        /// Mode of the lock after the grant.
        mode: LockMode,
    },
    /// The request was refused because a held lock has waiters.
    LockAborted {
        /// Account whose lock was requested.
        account: AccountId,
        /// Requested mode.
        mode: LockMode,
        /// Account of the held lock that has waiters.
        held_account: AccountId,
        /// Mode of that held lock.
        held_mode: LockMode,
    },
    /// A before-image was recorded.
    BeforeImage {
        /// Account.
        account: AccountId,
        /// Balance before this transaction touched the account.
        balance: Balance,
    },
    /// A balance was read.
    Read {
        /// Account.
        account: AccountId,
        /// Balance observed.
        balance: Balance,
    },
    /// A balance was written.
    Wrote {
        /// Account.
        account: AccountId,
        /// New balance.
        balance: Balance,
    },
    /// A balance was restored from the before-image.
    RolledBack {
        /// Account.
        account: AccountId,
        /// Restored balance.
        balance: Balance,
    },
    /// All locks were released.
    Unlocked {
        /// Number of locks released.
        locks: usize,
    },
    /// The transaction committed.
    Committed,
    /// The transaction aborted.
    Aborted,
}

impl fmt::Display for TxnEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxnEventKind::Opened => write!(f, "open"),
            TxnEventKind::LockRequested { account, mode } => {
                write!(f, "try to set {mode} on {account}")
            }
            TxnEventKind::LockWaiting { account, mode } => {
                write!(f, "---> wait to set {mode} on {account}")
            }
            TxnEventKind::LockWoke { account, mode } => {
                write!(f, "<--- woke up, retry {mode} on {account}")
            }
            TxnEventKind::LockGranted { account, mode } => write!(f, "holding {mode} on {account}"),
            TxnEventKind::LockAborted {
                account,
                mode,
                held_account,
                held_mode,
            } => write!(
                f,
                "abort setting {mode} on {account} while holding {held_mode} on {held_account}"
            ),
            TxnEventKind::BeforeImage { account, balance } => {
                write!(f, "before-image {account} = {balance}")
            }
            TxnEventKind::Read { account, balance } => write!(f, "read {account} = {balance}"),
            TxnEventKind::Wrote { account, balance } => write!(f, "write {account} = {balance}"),
            TxnEventKind::RolledBack { account, balance } => {
                write!(f, "restore {account} = {balance}")
            }
            TxnEventKind::Unlocked { locks } => write!(f, "released {locks} lock(s)"),
            TxnEventKind::Committed => write!(f, "commit"),
            TxnEventKind::Aborted => write!(f, "abort"),
        }
    }
}

/// A stamped log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnEvent {
    /// Process-wide sequence number.
    pub seq: u64,
    /// Wall-clock time the event was recorded.
    pub at: SystemTime,
    /// The event.
    pub kind: TxnEventKind,
}

/// Append-only event log of one transaction.
#[derive(Debug, Clone)]
pub struct TxnLog {
    txn: TransactionId,
    events: Vec<TxnEvent>,
}

impl TxnLog {
    pub(crate) fn new(txn: TransactionId) -> Self {
        Self {
            txn,
            events: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, seq: u64, kind: TxnEventKind) {
        self.events.push(TxnEvent {
            seq,
            at: SystemTime::now(),
            kind,
        });
    }

    /// Returns the recorded events in order.
    #[must_use]
    pub fn events(&self) -> &[TxnEvent] {
        &self.events
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl fmt::Display for TxnLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for event in &self.events {
            writeln!(f, "{} {} | {}", event.seq, self.txn, event.kind)?;
        }
        Ok(())
    }
}
