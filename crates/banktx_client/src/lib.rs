//! # banktx Client
//!
//! Client side of the banktx protocol.
//!
//! This crate provides:
//! - [`ServerProxy`], one connection per transaction attempt
//! - [`TransferDriver`], a concurrent random-transfer workload that retries
//!   aborted transactions
//! - [`ClientConfig`], loaded from the same TOML file as the server
//!
//! ```no_run
//! use banktx_client::{shutdown, ClientConfig, TransferDriver};
//!
//! let config = ClientConfig::default().with_number_of_transactions(20);
//! let addr = config.server_addr;
//! let stats = TransferDriver::new(config)?.run()?;
//! println!("{} committed, {} retried", stats.committed, stats.aborted_attempts);
//! shutdown(addr)?;
//! # Ok::<(), banktx_client::ClientError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod driver;
mod error;
mod proxy;

pub use config::ClientConfig;
pub use driver::{DriverStats, TransferDriver};
pub use error::{ClientError, ClientResult};
pub use proxy::{shutdown, ServerProxy};
