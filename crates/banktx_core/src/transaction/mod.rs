//! Transaction lifecycle.
//!
//! A transaction is opened by the [`TransactionRegistry`], driven by exactly
//! one connection worker, and filed back into the registry as committed or
//! aborted when it finishes.

mod log;
mod registry;
mod state;

pub use log::{EventSequencer, TxnEvent, TxnEventKind, TxnLog};
pub use registry::{RegistryCounts, TransactionRegistry};
pub use state::{Transaction, TransactionState};
