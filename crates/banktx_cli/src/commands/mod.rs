//! CLI command implementations.

pub mod drive;
pub mod serve;
pub mod shutdown;

use std::error::Error;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// A single JSON document.
    Json,
}

/// Result type shared by all commands.
pub type CommandResult = Result<(), Box<dyn Error>>;
