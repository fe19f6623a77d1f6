//! Serve command implementation.

use super::{CommandResult, OutputFormat};
use banktx_core::{AccountReport, Balance};
use banktx_server::{Server, ServerConfig};
use std::net::SocketAddr;
use std::path::Path;

/// Overrides applied on top of the configuration file.
#[derive(Debug, Default)]
pub struct ServeOptions {
    /// Address to bind to.
    pub bind: Option<SocketAddr>,
    /// Number of accounts.
    pub accounts: Option<u32>,
    /// Initial balance per account.
    pub initial_balance: Option<Balance>,
}

/// Runs the server until shutdown and prints the final balances.
pub fn run(config_path: Option<&Path>, options: ServeOptions, format: OutputFormat) -> CommandResult {
    let mut config = match config_path {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = options.bind {
        config.bind_addr = bind;
    }
    if let Some(accounts) = options.accounts {
        config.number_of_accounts = accounts;
    }
    if let Some(balance) = options.initial_balance {
        config.initial_balance = balance;
    }

    let server = Server::bind(config)?;
    let report = server.run()?;
    print_report(&report, format)
}

fn print_report(report: &AccountReport, format: OutputFormat) -> CommandResult {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            for account in &report.accounts {
                println!("{:>8}  {:>12}", account.id, account.balance);
            }
            println!("{:>8}  {:>12}", "total", report.total);
        }
    }
    Ok(())
}
