//! Random transfer workload.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::proxy::ServerProxy;
use banktx_core::{AccountId, TransactionId};
use rand::Rng;
use serde::Serialize;
use std::thread;
use tracing::{debug, info, warn};

/// Totals of a finished workload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DriverStats {
    /// Transfers that committed.
    pub committed: u64,
    /// Attempts the server aborted and that were retried.
    pub aborted_attempts: u64,
}

impl DriverStats {
    fn merge(&mut self, other: DriverStats) {
        self.committed += other.committed;
        self.aborted_attempts += other.aborted_attempts;
    }
}

/// Runs concurrent transfers between random account pairs.
///
/// Each transfer runs on its own thread and connection:
/// `READ a`, `WRITE a - amount`, `READ b`, `WRITE b + amount`, `CLOSE`.
/// An aborted attempt is retried on a fresh connection.
#[derive(Debug, Clone)]
pub struct TransferDriver {
    config: ClientConfig,
}

impl TransferDriver {
    /// Creates a driver for a validated configuration.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Runs `number_of_transactions` transfers concurrently and waits for all
    /// of them.
    pub fn run(&self) -> ClientResult<DriverStats> {
        info!(
            server = %self.config.server_addr,
            transfers = self.config.number_of_transactions,
            "starting transfers"
        );

        let handles: Vec<_> = (0..self.config.number_of_transactions)
            .map(|i| {
                let driver = self.clone();
                thread::Builder::new()
                    .name(format!("banktx-transfer-{i}"))
                    .spawn(move || {
                        let (from, to) = driver.pick_pair(&mut rand::thread_rng());
                        driver.transfer(from, to)
                    })
            })
            .collect::<Result<_, _>>()?;

        let mut stats = DriverStats::default();
        let mut first_error = None;
        for handle in handles {
            match handle.join() {
                Ok(Ok(outcome)) => stats.merge(outcome),
                Ok(Err(err)) => {
                    warn!(error = %err, "transfer failed");
                    first_error.get_or_insert(err);
                }
                Err(_) => {
                    first_error.get_or_insert(ClientError::WorkerPanicked);
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        info!(
            committed = stats.committed,
            aborted_attempts = stats.aborted_attempts,
            "transfers finished"
        );
        Ok(stats)
    }

    /// Moves the configured amount from `from` to `to`, retrying aborted
    /// attempts.
    pub fn transfer(&self, from: AccountId, to: AccountId) -> ClientResult<DriverStats> {
        let mut stats = DriverStats::default();
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.attempt(from, to) {
                Ok(txn) => {
                    debug!(%txn, %from, %to, attempts, "transfer committed");
                    stats.committed += 1;
                    return Ok(stats);
                }
                Err(err) if err.is_aborted() => {
                    debug!(%from, %to, attempts, "transfer aborted, retrying");
                    stats.aborted_attempts += 1;
                    if self.config.max_attempts != 0 && attempts >= self.config.max_attempts {
                        return Err(ClientError::RetriesExhausted { attempts });
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn attempt(&self, from: AccountId, to: AccountId) -> ClientResult<TransactionId> {
        let amount = self.config.transfer_amount;
        let mut proxy = ServerProxy::connect(self.config.server_addr)?;
        proxy.open_transaction()?;

        let a = proxy.read(from)?;
        proxy.write(from, a - amount)?;
        let b = proxy.read(to)?;
        proxy.write(to, b + amount)?;
        proxy.close_transaction()
    }

    /// Picks two distinct accounts uniformly.
    fn pick_pair<R: Rng>(&self, rng: &mut R) -> (AccountId, AccountId) {
        let n = self.config.number_of_accounts;
        let from = rng.gen_range(1..=n);
        let mut to = rng.gen_range(1..n);
        if to >= from {
            to += 1;
        }
        (AccountId::new(from), AccountId::new(to))
    }
}
