//! Accept loop.

use crate::config::ServerConfig;
use crate::context::ServerContext;
use crate::error::ServerResult;
use crate::worker::ConnectionWorker;
use banktx_core::AccountReport;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};

/// The transaction server.
///
/// Accepts connections and serves each one on its own thread with a
/// [`ConnectionWorker`]. Runs until a client sends `SHUTDOWN` or a
/// connection fails.
///
/// # Example
///
/// ```no_run
/// use banktx_server::{Server, ServerConfig};
///
/// let config = ServerConfig::default().with_number_of_accounts(10);
/// let server = Server::bind(config).unwrap();
/// let report = server.run().unwrap();
/// println!("total = {}", report.total);
/// ```
pub struct Server {
    listener: TcpListener,
    context: Arc<ServerContext>,
}

impl Server {
    /// Validates `config` and binds the listener.
    pub fn bind(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let listener = TcpListener::bind(config.bind_addr)?;
        let local_addr = listener.local_addr()?;
        info!(
            addr = %local_addr,
            accounts = config.number_of_accounts,
            initial_balance = config.initial_balance,
            "server listening"
        );
        let context = Arc::new(ServerContext::new(config, local_addr));
        Ok(Self { listener, context })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.context.local_addr()
    }

    /// Returns the shared context.
    pub fn context(&self) -> &Arc<ServerContext> {
        &self.context
    }

    /// Serves connections until shutdown, then returns the final balances.
    pub fn run(self) -> ServerResult<AccountReport> {
        let mut next_worker: u64 = 0;
        for stream in self.listener.incoming() {
            if self.context.is_shutting_down() {
                break;
            }
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            };

            let peer = stream
                .peer_addr()
                .map_or_else(|_| "unknown".to_string(), |addr| addr.to_string());
            next_worker += 1;
            let context = Arc::clone(&self.context);
            let spawned = thread::Builder::new()
                .name(format!("banktx-worker-{next_worker}"))
                .spawn(move || ConnectionWorker::new(stream, context, peer).run());
            if let Err(e) = spawned {
                error!(error = %e, "cannot spawn worker thread");
            }
        }

        info!("server stopped");
        Ok(self
            .context
            .final_report()
            .unwrap_or_else(|| self.context.engine().report()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpStream;

    fn local_config() -> ServerConfig {
        ServerConfig::new("127.0.0.1:0".parse().unwrap())
            .with_number_of_accounts(4)
            .with_initial_balance(25)
    }

    #[test]
    fn binds_ephemeral_port() {
        let server = Server::bind(local_config()).unwrap();
        assert_ne!(server.local_addr().port(), 0);
        assert_eq!(server.context().engine().report().total, 100);
    }

    #[test]
    fn invalid_config_does_not_bind() {
        assert!(Server::bind(local_config().with_number_of_accounts(0)).is_err());
    }

    #[test]
    fn triggered_shutdown_ends_run() {
        let server = Server::bind(local_config()).unwrap();
        let context = Arc::clone(server.context());
        let handle = thread::spawn(move || server.run());

        context.trigger_shutdown("test");
        let report = handle.join().unwrap().unwrap();
        assert_eq!(report.total, 100);
    }

    #[test]
    fn silent_disconnect_shuts_down() {
        let server = Server::bind(local_config()).unwrap();
        let addr = server.local_addr();
        let handle = thread::spawn(move || server.run());

        drop(TcpStream::connect(addr).unwrap());
        let report = handle.join().unwrap().unwrap();
        assert_eq!(report.accounts.len(), 4);
    }
}
