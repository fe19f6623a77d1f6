//! # banktx Protocol
//!
//! Wire messages and framing for the banktx transaction server.
//!
//! This crate provides:
//! - [`Message`], the typed protocol messages, and their numeric type codes
//! - A length-prefixed CBOR frame codec over any `Read`/`Write` stream
//!
//! A client session is one transaction attempt:
//! 1. `OPEN_TRANSACTION` → `TRANSACTION_OPENED(id)`
//! 2. any number of `READ_REQUEST` / `WRITE_REQUEST`, each answered with
//!    `READ_REQUEST_RESPONSE`, `WRITE_REQUEST_RESPONSE`, `ACCOUNT_NOT_FOUND`
//!    or `TRANSACTION_ABORTED`
//! 3. `CLOSE_TRANSACTION` → `TRANSACTION_COMMITTED(id)`
//!
//! An aborted transaction ends the session; the server closes the connection.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod codec;
mod error;
mod messages;

pub use codec::{decode, encode, read_message, write_message, MAX_FRAME_LEN};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{Envelope, Message, MessageType, Payload};
