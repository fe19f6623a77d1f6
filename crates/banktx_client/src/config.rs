//! Client configuration.

use crate::error::{ClientError, ClientResult};
use banktx_core::Balance;
use serde::Deserialize;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

/// Configuration for the transfer workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server address.
    pub server_addr: SocketAddr,
    /// Number of accounts on the server, numbered from 1.
    pub number_of_accounts: u32,
    /// Balance every account started with.
    pub initial_balance: Balance,
    /// Number of concurrent transfers.
    pub number_of_transactions: u32,
    /// Amount moved by each transfer.
    pub transfer_amount: Balance,
    /// Attempts per transfer before giving up; 0 retries forever.
    pub max_attempts: u32,
}

/// On-disk form, sharing its keys with the server's file.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct ClientConfigFile {
    server_ip: IpAddr,
    server_port: u16,
    number_of_accounts: u32,
    initial_balance: Balance,
    number_of_transactions: u32,
    transfer_amount: Balance,
    max_attempts: u32,
}

impl Default for ClientConfigFile {
    fn default() -> Self {
        let config = ClientConfig::default();
        Self {
            server_ip: config.server_addr.ip(),
            server_port: config.server_addr.port(),
            number_of_accounts: config.number_of_accounts,
            initial_balance: config.initial_balance,
            number_of_transactions: config.number_of_transactions,
            transfer_amount: config.transfer_amount,
            max_attempts: config.max_attempts,
        }
    }
}

impl ClientConfig {
    /// Creates a configuration with default workload settings.
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            number_of_accounts: 10,
            initial_balance: 10,
            number_of_transactions: 10,
            transfer_amount: 5,
            max_attempts: 0,
        }
    }

    /// Sets the number of accounts.
    pub fn with_number_of_accounts(mut self, count: u32) -> Self {
        self.number_of_accounts = count;
        self
    }

    /// Sets the number of concurrent transfers.
    pub fn with_number_of_transactions(mut self, count: u32) -> Self {
        self.number_of_transactions = count;
        self
    }

    /// Sets the amount moved by each transfer.
    pub fn with_transfer_amount(mut self, amount: Balance) -> Self {
        self.transfer_amount = amount;
        self
    }

    /// Caps the attempts per transfer.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Loads and validates a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| ClientError::config(path.display(), format!("cannot read file: {e}")))?;
        Self::parse(&contents).map_err(|message| ClientError::config(path.display(), message))
    }

    /// Parses and validates a TOML configuration.
    pub fn from_toml_str(contents: &str) -> ClientResult<Self> {
        Self::parse(contents).map_err(|message| ClientError::config("<inline>", message))
    }

    /// Checks that the workload can run.
    pub fn validate(&self) -> ClientResult<()> {
        self.check()
            .map_err(|message| ClientError::config("<config>", message))
    }

    fn parse(contents: &str) -> Result<Self, String> {
        let file: ClientConfigFile = toml::from_str(contents).map_err(|e| e.message().to_string())?;
        let config = Self {
            server_addr: SocketAddr::new(file.server_ip, file.server_port),
            number_of_accounts: file.number_of_accounts,
            initial_balance: file.initial_balance,
            number_of_transactions: file.number_of_transactions,
            transfer_amount: file.transfer_amount,
            max_attempts: file.max_attempts,
        };
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), String> {
        if self.number_of_accounts < 2 {
            return Err("number_of_accounts must be at least 2 to pick distinct accounts".into());
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 7070))
    }
}
