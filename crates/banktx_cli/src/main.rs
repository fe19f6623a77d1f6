//! banktx CLI
//!
//! Runs the transaction server and its transfer workload.
//!
//! # Commands
//!
//! - `serve` - Run the server until a client sends SHUTDOWN
//! - `drive` - Run concurrent random transfers against a server
//! - `shutdown` - Ask a server to report its balances and stop

mod commands;

use clap::{Parser, Subcommand};
use commands::drive::DriveOptions;
use commands::serve::ServeOptions;
use commands::OutputFormat;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Two-phase locking transaction server.
#[derive(Parser)]
#[command(name = "banktx")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server until shutdown
    Serve {
        /// Address to bind to
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Number of accounts
        #[arg(short, long)]
        accounts: Option<u32>,

        /// Initial balance of every account
        #[arg(short, long)]
        initial_balance: Option<i64>,

        /// Output format for the final report
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Run random transfers against a server
    Drive {
        /// Server address
        #[arg(short, long)]
        server: Option<SocketAddr>,

        /// Number of concurrent transfers
        #[arg(short, long)]
        transactions: Option<u32>,

        /// Amount moved by each transfer
        #[arg(short, long)]
        amount: Option<i64>,

        /// Do not send SHUTDOWN when done
        #[arg(short, long)]
        keep_server: bool,

        /// Output format for the statistics
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Ask a server to stop
    Shutdown {
        /// Server address
        #[arg(short, long)]
        server: Option<SocketAddr>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Serve {
            bind,
            accounts,
            initial_balance,
            format,
        } => {
            let options = ServeOptions {
                bind,
                accounts,
                initial_balance,
            };
            commands::serve::run(config, options, format)?;
        }
        Commands::Drive {
            server,
            transactions,
            amount,
            keep_server,
            format,
        } => {
            let options = DriveOptions {
                server,
                transactions,
                amount,
                keep_server,
            };
            commands::drive::run(config, options, format)?;
        }
        Commands::Shutdown { server } => {
            commands::shutdown::run(config, server)?;
        }
    }

    Ok(())
}
