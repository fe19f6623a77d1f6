//! Per-connection protocol state machine.
//!
//! A worker serves exactly one connection and at most one transaction:
//!
//! | State         | Request             | Next state                  |
//! |---------------|---------------------|-----------------------------|
//! | awaiting open | `OPEN_TRANSACTION`  | active                      |
//! | active        | `READ_REQUEST`      | active, or terminated on abort |
//! | active        | `WRITE_REQUEST`     | active, or terminated on abort |
//! | active        | `CLOSE_TRANSACTION` | terminated (committed)      |
//! | any           | `SHUTDOWN`          | terminated, server stops    |
//! | any           | peer closed / I/O   | terminated, server stops    |
//!
//! Anything else is a protocol violation: an active transaction is aborted
//! and the connection is dropped, but the server keeps running.

use crate::context::ServerContext;
use crate::error::ServerError;
use banktx_core::{AccountId, Balance, CoreError, Transaction};
use banktx_protocol::{read_message, write_message, Message, MessageType, ProtocolError};
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Where a worker is in its connection's life.
#[derive(Debug)]
pub enum WorkerState {
    /// Connected; no transaction yet.
    AwaitingOpen,
    /// Serving requests for the owned transaction.
    Active(Transaction),
    /// Done; the connection will be closed.
    Terminated,
}

impl WorkerState {
    /// Short name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            WorkerState::AwaitingOpen => "awaiting open",
            WorkerState::Active(_) => "active",
            WorkerState::Terminated => "terminated",
        }
    }
}

/// Serves one client connection.
pub struct ConnectionWorker<S> {
    stream: S,
    context: Arc<ServerContext>,
    peer: String,
}

impl<S: Read + Write> ConnectionWorker<S> {
    /// Creates a worker for an accepted connection.
    pub fn new(stream: S, context: Arc<ServerContext>, peer: impl Into<String>) -> Self {
        Self {
            stream,
            context,
            peer: peer.into(),
        }
    }

    /// Runs the state machine until the connection terminates.
    pub fn run(&mut self) {
        debug!(peer = %self.peer, "worker started");
        let mut state = WorkerState::AwaitingOpen;
        while !matches!(state, WorkerState::Terminated) {
            state = self.step(state);
        }
        debug!(peer = %self.peer, "worker finished");
    }

    /// Returns the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Reads one request and performs the transition it triggers.
    fn step(&mut self, state: WorkerState) -> WorkerState {
        let message = match read_message(&mut self.stream) {
            Ok(Some(message)) => message,
            Ok(None) => return self.peer_closed(state),
            Err(err) if err.is_io() => return self.connection_failed(state, err.into()),
            Err(err) => {
                warn!(peer = %self.peer, error = %err, "malformed frame");
                return self.terminate(state);
            }
        };
        debug!(peer = %self.peer, state = state.name(), %message, "request");

        match (state, message) {
            (state, Message::Shutdown) => self.shutdown(state),
            (WorkerState::AwaitingOpen, Message::OpenTransaction) => self.open(),
            (WorkerState::Active(txn), Message::ReadRequest { account }) => {
                self.read(txn, account)
            }
            (WorkerState::Active(txn), Message::WriteRequest { account, balance }) => {
                self.write(txn, account, balance)
            }
            (WorkerState::Active(txn), Message::CloseTransaction) => self.close(txn),
            (state, message) => self.violation(state, message.message_type()),
        }
    }

    fn open(&mut self) -> WorkerState {
        let txn = self.context.engine().open();
        let id = txn.id();
        self.reply(WorkerState::Active(txn), &Message::TransactionOpened { txn: id })
    }

    fn read(&mut self, mut txn: Transaction, account: AccountId) -> WorkerState {
        match self.context.engine().read(&mut txn, account) {
            Ok(balance) => self.reply(
                WorkerState::Active(txn),
                &Message::ReadRequestResponse { balance },
            ),
            Err(err) => self.request_failed(txn, err),
        }
    }

    fn write(&mut self, mut txn: Transaction, account: AccountId, balance: Balance) -> WorkerState {
        match self.context.engine().write(&mut txn, account, balance) {
            Ok(()) => self.reply(WorkerState::Active(txn), &Message::WriteRequestResponse),
            Err(err) => self.request_failed(txn, err),
        }
    }

    fn close(&mut self, txn: Transaction) -> WorkerState {
        let id = txn.id();
        let outcome = match self.context.engine().commit(txn) {
            Ok(_) => Message::TransactionCommitted { txn: id },
            Err(err) => {
                error!(peer = %self.peer, txn = %id, error = %err, "commit failed");
                Message::TransactionAborted { txn: id }
            }
        };
        self.reply(WorkerState::Terminated, &outcome)
    }

    /// NotFound keeps the transaction open; anything else aborts it and ends
    /// the connection.
    fn request_failed(&mut self, txn: Transaction, err: CoreError) -> WorkerState {
        if let CoreError::AccountNotFound(account) = err {
            return self.reply(
                WorkerState::Active(txn),
                &Message::AccountNotFound { account },
            );
        }

        let id = txn.id();
        info!(peer = %self.peer, txn = %id, reason = %err, "aborting transaction");
        self.abort(txn);
        self.reply(WorkerState::Terminated, &Message::TransactionAborted { txn: id })
    }

    fn shutdown(&mut self, state: WorkerState) -> WorkerState {
        info!(peer = %self.peer, "shutdown requested");
        if let WorkerState::Active(txn) = state {
            self.abort(txn);
        }
        if self.context.trigger_shutdown("shutdown requested") {
            if let Some(report) = self.context.final_report() {
                for account in &report.accounts {
                    info!(account = %account.id, balance = account.balance, "final balance");
                }
                info!(total = %report.total, "sum of all balances");
            }
        }
        WorkerState::Terminated
    }

    fn violation(&mut self, state: WorkerState, message_type: MessageType) -> WorkerState {
        let err = ServerError::ProtocolViolation {
            state: state.name(),
            message_type,
        };
        warn!(peer = %self.peer, error = %err, "protocol violation");
        self.terminate(state)
    }

    /// Aborts an active transaction, tells the client, and drops the
    /// connection without stopping the server.
    fn terminate(&mut self, state: WorkerState) -> WorkerState {
        if let WorkerState::Active(txn) = state {
            let id = txn.id();
            self.abort(txn);
            return self.reply(WorkerState::Terminated, &Message::TransactionAborted { txn: id });
        }
        WorkerState::Terminated
    }

    fn peer_closed(&mut self, state: WorkerState) -> WorkerState {
        info!(peer = %self.peer, state = state.name(), "connection closed by peer");
        if let WorkerState::Active(txn) = state {
            self.abort(txn);
        }
        self.context.trigger_shutdown("connection closed by peer");
        WorkerState::Terminated
    }

    fn connection_failed(&mut self, state: WorkerState, err: ServerError) -> WorkerState {
        error!(peer = %self.peer, state = state.name(), error = %err, "connection failed");
        if let WorkerState::Active(txn) = state {
            self.abort(txn);
        }
        self.context.trigger_shutdown("connection failed");
        WorkerState::Terminated
    }

    /// Sends `message`, moving to `next` on success.
    fn reply(&mut self, next: WorkerState, message: &Message) -> WorkerState {
        debug!(peer = %self.peer, %message, "reply");
        match write_message(&mut self.stream, message) {
            Ok(()) => next,
            Err(err) => self.reply_failed(next, err),
        }
    }

    fn reply_failed(&mut self, state: WorkerState, err: ProtocolError) -> WorkerState {
        if err.is_io() {
            return self.connection_failed(state, err.into());
        }
        error!(peer = %self.peer, error = %err, "cannot encode reply");
        if let WorkerState::Active(txn) = state {
            self.abort(txn);
        }
        WorkerState::Terminated
    }

    fn abort(&self, txn: Transaction) {
        let id = txn.id();
        if let Err(err) = self.context.engine().abort(txn) {
            error!(peer = %self.peer, txn = %id, error = %err, "abort failed");
        }
    }
}
