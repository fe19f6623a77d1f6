//! Connection to the server.

use crate::error::{ClientError, ClientResult};
use banktx_core::{AccountId, Balance, TransactionId};
use banktx_protocol::{read_message, write_message, Message};
use std::net::{SocketAddr, TcpStream};
use tracing::debug;

/// One connection carrying one transaction attempt.
///
/// After an abort or a commit the server closes the connection; open a new
/// proxy to try again.
#[derive(Debug)]
pub struct ServerProxy {
    stream: TcpStream,
    txn: Option<TransactionId>,
}

impl ServerProxy {
    /// Connects to the server.
    pub fn connect(addr: SocketAddr) -> ClientResult<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self { stream, txn: None })
    }

    /// Returns the open transaction, if any.
    pub fn transaction(&self) -> Option<TransactionId> {
        self.txn
    }

    /// Opens a transaction.
    pub fn open_transaction(&mut self) -> ClientResult<TransactionId> {
        match self.call(&Message::OpenTransaction)? {
            Message::TransactionOpened { txn } => {
                self.txn = Some(txn);
                Ok(txn)
            }
            other => Err(unexpected("TRANSACTION_OPENED", &other)),
        }
    }

    /// Reads an account balance.
    pub fn read(&mut self, account: AccountId) -> ClientResult<Balance> {
        self.require_transaction()?;
        match self.call(&Message::ReadRequest { account })? {
            Message::ReadRequestResponse { balance } => Ok(balance),
            other => Err(self.failure("READ_REQUEST_RESPONSE", other)),
        }
    }

    /// Overwrites an account balance.
    pub fn write(&mut self, account: AccountId, balance: Balance) -> ClientResult<()> {
        self.require_transaction()?;
        match self.call(&Message::WriteRequest { account, balance })? {
            Message::WriteRequestResponse => Ok(()),
            other => Err(self.failure("WRITE_REQUEST_RESPONSE", other)),
        }
    }

    /// Commits the open transaction.
    pub fn close_transaction(&mut self) -> ClientResult<TransactionId> {
        self.require_transaction()?;
        match self.call(&Message::CloseTransaction)? {
            Message::TransactionCommitted { txn } => {
                self.txn = None;
                Ok(txn)
            }
            other => Err(self.failure("TRANSACTION_COMMITTED", other)),
        }
    }

    /// Asks the server to stop and waits for it to close the connection.
    pub fn shutdown(mut self) -> ClientResult<()> {
        write_message(&mut self.stream, &Message::Shutdown)?;
        while read_message(&mut self.stream)?.is_some() {}
        Ok(())
    }

    fn call(&mut self, request: &Message) -> ClientResult<Message> {
        debug!(%request, "sending");
        write_message(&mut self.stream, request)?;
        read_message(&mut self.stream)?.ok_or(ClientError::ServerClosed)
    }

    fn require_transaction(&self) -> ClientResult<()> {
        self.txn.map(|_| ()).ok_or(ClientError::NoTransaction)
    }

    /// Maps a reply that is not the expected success.
    fn failure(&mut self, expected: &'static str, reply: Message) -> ClientError {
        match reply {
            Message::TransactionAborted { txn } => {
                self.txn = None;
                ClientError::Aborted { txn }
            }
            Message::AccountNotFound { account } => ClientError::AccountNotFound(account),
            other => unexpected(expected, &other),
        }
    }
}

fn unexpected(expected: &'static str, reply: &Message) -> ClientError {
    ClientError::UnexpectedReply {
        expected,
        actual: reply.message_type(),
    }
}

/// Sends `SHUTDOWN` to the server at `addr`.
pub fn shutdown(addr: SocketAddr) -> ClientResult<()> {
    ServerProxy::connect(addr)?.shutdown()
}
