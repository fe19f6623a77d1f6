//! Error types for banktx core.

use crate::types::{AccountId, TransactionId};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in banktx core operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The deadlock heuristic refused a lock request.
    ///
    /// The transaction cannot continue; it must be rolled back and unlocked.
    #[error("{txn} aborted while locking {account}: {reason}")]
    Aborted {
        /// The aborted transaction.
        txn: TransactionId,
        /// The account whose lock was requested.
        account: AccountId,
        /// Why the request was refused.
        reason: String,
    },

    /// The requested account does not exist.
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    /// Operation not permitted in the transaction's current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates an aborted error.
    pub fn aborted(txn: TransactionId, account: AccountId, reason: impl Into<String>) -> Self {
        Self::Aborted {
            txn,
            account,
            reason: reason.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true if the transaction was aborted by the lock manager.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, CoreError::Aborted { .. })
    }

    /// Returns true if the error names an unknown account.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::AccountNotFound(_))
    }
}
