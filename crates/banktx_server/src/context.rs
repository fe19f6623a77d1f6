//! Shared server context.

use crate::config::ServerConfig;
use banktx_core::{AccountReport, Engine};
use parking_lot::Mutex;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// State shared by the accept loop and every connection worker.
///
/// Built once per server and handed to each worker behind an `Arc`.
#[derive(Debug)]
pub struct ServerContext {
    config: ServerConfig,
    engine: Engine,
    local_addr: SocketAddr,
    shutdown: AtomicBool,
    /// Balances captured when shutdown was first triggered.
    final_report: Mutex<Option<AccountReport>>,
}

impl ServerContext {
    /// Creates a context with a fresh engine sized by `config`.
    pub fn new(config: ServerConfig, local_addr: SocketAddr) -> Self {
        let engine = Engine::new(config.number_of_accounts, config.initial_balance);
        Self {
            config,
            engine,
            local_addr,
            shutdown: AtomicBool::new(false),
            final_report: Mutex::new(None),
        }
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the transaction engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns true once shutdown has been triggered.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Starts process shutdown.
    ///
    /// The first caller captures the account report and wakes the accept
    /// loop; later calls do nothing. Returns true for the first caller.
    pub fn trigger_shutdown(&self, reason: &str) -> bool {
        if self
            .shutdown
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(reason, "shutdown already in progress");
            return false;
        }

        let report = self.engine.report();
        info!(reason, total = %report.total, "shutting down");
        *self.final_report.lock() = Some(report);
        self.wake_accept_loop();
        true
    }

    /// Returns the report captured at shutdown, if shutdown has happened.
    pub fn final_report(&self) -> Option<AccountReport> {
        self.final_report.lock().clone()
    }

    /// Unblocks `accept` by connecting to our own listener.
    fn wake_accept_loop(&self) {
        let mut addr = self.local_addr;
        if addr.ip().is_unspecified() {
            let loopback = match addr.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            };
            addr.set_ip(loopback);
        }
        if let Err(e) = TcpStream::connect_timeout(&addr, Duration::from_secs(1)) {
            debug!(%addr, error = %e, "could not wake accept loop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ServerContext {
        let config = ServerConfig::default()
            .with_number_of_accounts(3)
            .with_initial_balance(5);
        // Nothing listens on port 9; waking fails quietly.
        ServerContext::new(config, "127.0.0.1:9".parse().unwrap())
    }

    #[test]
    fn engine_is_sized_by_config() {
        let ctx = context();
        assert_eq!(ctx.engine().accounts().len(), 3);
        assert_eq!(ctx.engine().report().total, 15);
    }

    #[test]
    fn shutdown_triggers_once_and_keeps_report() {
        let ctx = context();
        assert!(!ctx.is_shutting_down());
        assert!(ctx.final_report().is_none());

        assert!(ctx.trigger_shutdown("test"));
        assert!(!ctx.trigger_shutdown("again"));

        assert!(ctx.is_shutting_down());
        assert_eq!(ctx.final_report().unwrap().total, 15);
    }
}
