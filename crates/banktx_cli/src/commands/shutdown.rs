//! Shutdown command implementation.

use super::CommandResult;
use banktx_client::ClientConfig;
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;

/// Asks the server to print its balances and stop.
pub fn run(config_path: Option<&Path>, server: Option<SocketAddr>) -> CommandResult {
    let addr = match (server, config_path) {
        (Some(addr), _) => addr,
        (None, Some(path)) => ClientConfig::load(path)?.server_addr,
        (None, None) => ClientConfig::default().server_addr,
    };
    banktx_client::shutdown(addr)?;
    info!(%addr, "shutdown sent");
    Ok(())
}
