//! Error types for the client.

use banktx_core::{AccountId, TransactionId};
use banktx_protocol::{MessageType, ProtocolError};
use std::fmt::Display;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to the server.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The server aborted the transaction and closed the connection.
    #[error("{txn} was aborted by the server")]
    Aborted {
        /// The aborted transaction.
        txn: TransactionId,
    },

    /// The server does not know the account.
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    /// The server answered with a message the client did not expect.
    #[error("expected {expected}, received {actual}")]
    UnexpectedReply {
        /// What the client was waiting for.
        expected: &'static str,
        /// What arrived.
        actual: MessageType,
    },

    /// The server closed the connection without replying.
    #[error("server closed the connection")]
    ServerClosed,

    /// No transaction is open on this connection.
    #[error("no open transaction")]
    NoTransaction,

    /// A transfer kept being aborted.
    #[error("transfer still aborted after {attempts} attempts")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
    },

    /// A transfer thread panicked.
    #[error("transfer thread panicked")]
    WorkerPanicked,

    /// Configuration could not be loaded or is invalid.
    #[error("configuration error in {path}: {message}")]
    Config {
        /// Where the configuration came from.
        path: String,
        /// What is wrong with it.
        message: String,
    },

    /// Message framing or encoding failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Creates a configuration error.
    pub fn config(path: impl Display, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Returns true if the transaction was aborted and may be retried.
    pub fn is_aborted(&self) -> bool {
        matches!(self, ClientError::Aborted { .. })
    }
}
