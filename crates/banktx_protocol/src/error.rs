//! Error types for the protocol crate.

use crate::messages::MessageType;
use std::io;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while framing, encoding or decoding messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failed to encode a message body.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a message body.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// A frame exceeds the maximum body length.
    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge {
        /// Announced or encoded body length.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// The type code names no known message.
    #[error("unknown message type code {0}")]
    UnknownMessageType(u8),

    /// The payload does not fit the message type.
    #[error("invalid payload for {message_type}")]
    InvalidPayload {
        /// Type named by the frame.
        message_type: MessageType,
    },

    /// A well-formed message arrived where another was expected.
    #[error("expected {expected}, received {actual}")]
    UnexpectedMessage {
        /// What the receiver was waiting for.
        expected: &'static str,
        /// What actually arrived.
        actual: MessageType,
    },
}

impl ProtocolError {
    /// Creates an encoding error.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Creates a decoding error.
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Returns true if the error came from the underlying stream rather than
    /// from malformed data.
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, ProtocolError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_classified() {
        let err: ProtocolError = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(err.is_io());
        assert!(!ProtocolError::UnknownMessageType(42).is_io());
    }

    #[test]
    fn display_names_the_message_type() {
        let err = ProtocolError::UnexpectedMessage {
            expected: "TRANSACTION_OPENED",
            actual: MessageType::Shutdown,
        };
        assert_eq!(err.to_string(), "expected TRANSACTION_OPENED, received SHUTDOWN");
    }
}
