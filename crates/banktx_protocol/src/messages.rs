//! Protocol messages.
//!
//! On the wire every message is an [`Envelope`]: a numeric type code plus a
//! payload. [`Message`] is the typed view; conversion between the two checks
//! that the payload matches the type.

use crate::error::{ProtocolError, ProtocolResult};
use banktx_core::{AccountId, Balance, TransactionId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Client asks for a new transaction.
    OpenTransaction,
    /// Client asks to commit its transaction.
    CloseTransaction,
    /// Client reads an account.
    ReadRequest,
    /// Client writes an account.
    WriteRequest,
    /// Server returns a balance.
    ReadRequestResponse,
    /// Server reports a commit.
    TransactionCommitted,
    /// Server reports an abort.
    TransactionAborted,
    /// Client asks the server to stop.
    Shutdown,
    /// Server returns the id of an opened transaction.
    TransactionOpened,
    /// Server acknowledges a write.
    WriteRequestResponse,
    /// Server reports an unknown account.
    AccountNotFound,
}

impl MessageType {
    const ALL: [MessageType; 11] = [
        MessageType::OpenTransaction,
        MessageType::CloseTransaction,
        MessageType::ReadRequest,
        MessageType::WriteRequest,
        MessageType::ReadRequestResponse,
        MessageType::TransactionCommitted,
        MessageType::TransactionAborted,
        MessageType::Shutdown,
        MessageType::TransactionOpened,
        MessageType::WriteRequestResponse,
        MessageType::AccountNotFound,
    ];

    /// Returns the wire code.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            MessageType::OpenTransaction => 1,
            MessageType::CloseTransaction => 2,
            MessageType::ReadRequest => 3,
            MessageType::WriteRequest => 4,
            MessageType::ReadRequestResponse => 5,
            MessageType::TransactionCommitted => 6,
            MessageType::TransactionAborted => 7,
            MessageType::Shutdown => 8,
            MessageType::TransactionOpened => 9,
            MessageType::WriteRequestResponse => 10,
            MessageType::AccountNotFound => 11,
        }
    }

    /// Looks up a type by wire code.
    #[must_use]
    pub fn from_code(code: u8) -> Option<MessageType> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Returns true for types only a client sends.
    #[must_use]
    pub fn is_request(self) -> bool {
        matches!(
            self,
            MessageType::OpenTransaction
                | MessageType::CloseTransaction
                | MessageType::ReadRequest
                | MessageType::WriteRequest
                | MessageType::Shutdown
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::OpenTransaction => "OPEN_TRANSACTION",
            MessageType::CloseTransaction => "CLOSE_TRANSACTION",
            MessageType::ReadRequest => "READ_REQUEST",
            MessageType::WriteRequest => "WRITE_REQUEST",
            MessageType::ReadRequestResponse => "READ_REQUEST_RESPONSE",
            MessageType::TransactionCommitted => "TRANSACTION_COMMITTED",
            MessageType::TransactionAborted => "TRANSACTION_ABORTED",
            MessageType::Shutdown => "SHUTDOWN",
            MessageType::TransactionOpened => "TRANSACTION_OPENED",
            MessageType::WriteRequestResponse => "WRITE_REQUEST_RESPONSE",
            MessageType::AccountNotFound => "ACCOUNT_NOT_FOUND",
        };
        f.write_str(name)
    }
}

/// A protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Open a transaction.
    OpenTransaction,
    /// Commit the open transaction.
    CloseTransaction,
    /// Read an account.
    ReadRequest {
        /// Account to read.
        account: AccountId,
    },
    /// Overwrite an account balance.
    WriteRequest {
        /// Account to write.
        account: AccountId,
        /// New balance.
        balance: Balance,
    },
    /// Balance of the account just read.
    ReadRequestResponse {
        /// Current balance.
        balance: Balance,
    },
    /// The transaction committed.
    TransactionCommitted {
        /// The committed transaction.
        txn: TransactionId,
    },
    /// The transaction was aborted and rolled back.
    TransactionAborted {
        /// The aborted transaction.
        txn: TransactionId,
    },
    /// Stop the server.
    Shutdown,
    /// A transaction was opened.
    TransactionOpened {
        /// The new transaction.
        txn: TransactionId,
    },
    /// The write was applied.
    WriteRequestResponse,
    /// The account does not exist; the transaction is still open.
    AccountNotFound {
        /// The unknown account.
        account: AccountId,
    },
}

impl Message {
    /// Returns the message type.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::OpenTransaction => MessageType::OpenTransaction,
            Message::CloseTransaction => MessageType::CloseTransaction,
            Message::ReadRequest { .. } => MessageType::ReadRequest,
            Message::WriteRequest { .. } => MessageType::WriteRequest,
            Message::ReadRequestResponse { .. } => MessageType::ReadRequestResponse,
            Message::TransactionCommitted { .. } => MessageType::TransactionCommitted,
            Message::TransactionAborted { .. } => MessageType::TransactionAborted,
            Message::Shutdown => MessageType::Shutdown,
            Message::TransactionOpened { .. } => MessageType::TransactionOpened,
            Message::WriteRequestResponse => MessageType::WriteRequestResponse,
            Message::AccountNotFound { .. } => MessageType::AccountNotFound,
        }
    }

    /// Returns the message type code.
    #[must_use]
    pub fn type_code(&self) -> u8 {
        self.message_type().code()
    }
}

/// Payload carried next to the type code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// No payload.
    Empty,
    /// An account id.
    Account(AccountId),
    /// An account id and a balance.
    Write(AccountId, Balance),
    /// A balance.
    Balance(Balance),
    /// A transaction id.
    Transaction(TransactionId),
}

/// Wire form of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type code.
    #[serde(rename = "type")]
    pub code: u8,
    /// Type-specific payload.
    pub payload: Payload,
}

impl From<&Message> for Envelope {
    fn from(message: &Message) -> Self {
        let payload = match *message {
            Message::OpenTransaction
            | Message::CloseTransaction
            | Message::Shutdown
            | Message::WriteRequestResponse => Payload::Empty,
            Message::ReadRequest { account } | Message::AccountNotFound { account } => {
                Payload::Account(account)
            }
            Message::WriteRequest { account, balance } => Payload::Write(account, balance),
            Message::ReadRequestResponse { balance } => Payload::Balance(balance),
            Message::TransactionCommitted { txn }
            | Message::TransactionAborted { txn }
            | Message::TransactionOpened { txn } => Payload::Transaction(txn),
        };
        Envelope {
            code: message.type_code(),
            payload,
        }
    }
}

impl TryFrom<Envelope> for Message {
    type Error = ProtocolError;

    fn try_from(envelope: Envelope) -> ProtocolResult<Self> {
        let message_type = MessageType::from_code(envelope.code)
            .ok_or(ProtocolError::UnknownMessageType(envelope.code))?;

        let message = match (message_type, envelope.payload) {
            (MessageType::OpenTransaction, Payload::Empty) => Message::OpenTransaction,
            (MessageType::CloseTransaction, Payload::Empty) => Message::CloseTransaction,
            (MessageType::Shutdown, Payload::Empty) => Message::Shutdown,
            (MessageType::WriteRequestResponse, Payload::Empty) => Message::WriteRequestResponse,
            (MessageType::ReadRequest, Payload::Account(account)) => {
                Message::ReadRequest { account }
            }
            (MessageType::AccountNotFound, Payload::Account(account)) => {
                Message::AccountNotFound { account }
            }
            (MessageType::WriteRequest, Payload::Write(account, balance)) => {
                Message::WriteRequest { account, balance }
            }
            (MessageType::ReadRequestResponse, Payload::Balance(balance)) => {
                Message::ReadRequestResponse { balance }
            }
            (MessageType::TransactionCommitted, Payload::Transaction(txn)) => {
                Message::TransactionCommitted { txn }
            }
            (MessageType::TransactionAborted, Payload::Transaction(txn)) => {
                Message::TransactionAborted { txn }
            }
            (MessageType::TransactionOpened, Payload::Transaction(txn)) => {
                Message::TransactionOpened { txn }
            }
            (message_type, _) => return Err(ProtocolError::InvalidPayload { message_type }),
        };
        Ok(message)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::ReadRequest { account } | Message::AccountNotFound { account } => {
                write!(f, "{} {account}", self.message_type())
            }
            Message::WriteRequest { account, balance } => {
                write!(f, "{} {account} {balance}", self.message_type())
            }
            Message::ReadRequestResponse { balance } => {
                write!(f, "{} {balance}", self.message_type())
            }
            Message::TransactionCommitted { txn }
            | Message::TransactionAborted { txn }
            | Message::TransactionOpened { txn } => write!(f, "{} {txn}", self.message_type()),
            _ => write!(f, "{}", self.message_type()),
        }
    }
}
