//! # banktx Server
//!
//! Threaded TCP server for the banktx transaction engine.
//!
//! This crate provides:
//! - [`Server`], the accept loop spawning one worker thread per connection
//! - [`ConnectionWorker`], the per-connection protocol state machine
//! - [`ServerContext`], the state shared by every worker
//! - [`ServerConfig`], loaded from TOML
//!
//! # Shutdown
//!
//! The server stops when a client sends `SHUTDOWN`, or when a connection
//! closes or fails while its worker is waiting for a request. Any transaction
//! still active on that connection is rolled back first. [`Server::run`]
//! returns the balances captured at that moment.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod context;
mod error;
mod server;
mod worker;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use context::ServerContext;
pub use error::{ServerError, ServerResult};
pub use server::Server;
pub use worker::{ConnectionWorker, WorkerState};
