//! Drive command implementation.

use super::{CommandResult, OutputFormat};
use banktx_client::{shutdown, ClientConfig, TransferDriver};
use banktx_core::Balance;
use std::net::SocketAddr;
use std::path::Path;

/// Overrides applied on top of the configuration file.
#[derive(Debug, Default)]
pub struct DriveOptions {
    /// Server address.
    pub server: Option<SocketAddr>,
    /// Number of concurrent transfers.
    pub transactions: Option<u32>,
    /// Amount per transfer.
    pub amount: Option<Balance>,
    /// Leave the server running afterwards.
    pub keep_server: bool,
}

/// Runs the transfer workload, then stops the server unless asked not to.
pub fn run(config_path: Option<&Path>, options: DriveOptions, format: OutputFormat) -> CommandResult {
    let mut config = match config_path {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    if let Some(server) = options.server {
        config.server_addr = server;
    }
    if let Some(count) = options.transactions {
        config.number_of_transactions = count;
    }
    if let Some(amount) = options.amount {
        config.transfer_amount = amount;
    }

    let addr = config.server_addr;
    let stats = TransferDriver::new(config)?.run()?;
    if !options.keep_server {
        shutdown(addr)?;
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => {
            println!("committed:        {}", stats.committed);
            println!("aborted attempts: {}", stats.aborted_attempts);
        }
    }
    Ok(())
}
