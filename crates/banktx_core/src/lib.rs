//! # banktx Core
//!
//! Transaction engine for the banktx server.
//!
//! This crate provides:
//! - An in-memory store of numbered accounts
//! - Per-account READ/WRITE locks under strict two-phase locking
//! - A conservative deadlock-avoidance rule that aborts instead of waiting
//! - Transactions with before-image rollback and an ordered event log
//! - A registry of running, committed and aborted transactions
//!
//! # Example
//!
//! ```rust
//! use banktx_core::{AccountId, Engine};
//!
//! let engine = Engine::new(2, 10);
//! let mut txn = engine.open();
//! let a = engine.read(&mut txn, AccountId::new(1)).unwrap();
//! engine.write(&mut txn, AccountId::new(1), a - 5).unwrap();
//! let b = engine.read(&mut txn, AccountId::new(2)).unwrap();
//! engine.write(&mut txn, AccountId::new(2), b + 5).unwrap();
//! engine.commit(txn).unwrap();
//!
//! assert_eq!(engine.report().total, 20);
//! ```
//!
//! This crate does no I/O.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod account;
mod engine;
mod error;
mod lock;
mod manager;
mod transaction;
mod types;

pub use account::{Account, AccountReport, AccountStore};
pub use engine::Engine;
pub use error::{CoreError, CoreResult};
pub use lock::{Lock, LockMode, LockSnapshot, LockTable};
pub use manager::AccountManager;
pub use transaction::{
    EventSequencer, RegistryCounts, Transaction, TransactionRegistry, TransactionState, TxnEvent,
    TxnEventKind, TxnLog,
};
pub use types::{AccountId, Balance, TransactionId};
