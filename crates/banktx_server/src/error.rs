//! Error types for the transaction server.

use banktx_core::CoreError;
use banktx_protocol::{MessageType, ProtocolError};
use std::fmt::Display;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the transaction server.
#[derive(Error, Debug)]
pub enum ServerError {
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

    /// A well-formed message arrived in a state that does not accept it.
    #[error("{message_type} is not allowed while {state}")]
    ProtocolViolation {
        /// Worker state when the message arrived.
        state: &'static str,
        /// The offending message type.
        message_type: MessageType,
    },

    /// The transaction engine rejected an operation.
    #[error("engine error: {0}")]
    Core(#[from] CoreError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(path: impl Display, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Returns true if the error means the connection itself is unusable.
    pub fn is_connection_error(&self) -> bool {
        match self {
            ServerError::Io(_) => true,
            ServerError::Protocol(err) => err.is_io(),
            _ => false,
        }
    }
}
