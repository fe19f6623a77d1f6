//! Server configuration.

use crate::error::{ServerError, ServerResult};
use banktx_core::Balance;
use serde::Deserialize;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

/// Default TCP port.
pub const DEFAULT_PORT: u16 = 7070;

/// Configuration for the transaction server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Number of accounts, numbered from 1.
    pub number_of_accounts: u32,
    /// Balance every account starts with.
    pub initial_balance: Balance,
}

/// On-disk form. Keys the server does not use are ignored so that one file
/// can configure both server and client.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct ServerConfigFile {
    server_ip: IpAddr,
    server_port: u16,
    number_of_accounts: u32,
    initial_balance: Balance,
}

impl Default for ServerConfigFile {
    fn default() -> Self {
        let config = ServerConfig::default();
        Self {
            server_ip: config.bind_addr.ip(),
            server_port: config.bind_addr.port(),
            number_of_accounts: config.number_of_accounts,
            initial_balance: config.initial_balance,
        }
    }
}

impl ServerConfig {
    /// Creates a configuration with default account settings.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            number_of_accounts: 10,
            initial_balance: 10,
        }
    }

    /// Sets the number of accounts.
    pub fn with_number_of_accounts(mut self, count: u32) -> Self {
        self.number_of_accounts = count;
        self
    }

    /// Sets the initial balance of every account.
    pub fn with_initial_balance(mut self, balance: Balance) -> Self {
        self.initial_balance = balance;
        self
    }

    /// Loads and validates a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| ServerError::config(path.display(), format!("cannot read file: {e}")))?;
        Self::parse(&contents).map_err(|message| ServerError::config(path.display(), message))
    }

    /// Parses and validates a TOML configuration.
    pub fn from_toml_str(contents: &str) -> ServerResult<Self> {
        Self::parse(contents).map_err(|message| ServerError::config("<inline>", message))
    }

    /// Checks that the configuration can run a server.
    pub fn validate(&self) -> ServerResult<()> {
        self.check()
            .map_err(|message| ServerError::config("<config>", message))
    }

    fn parse(contents: &str) -> Result<Self, String> {
        let file: ServerConfigFile = toml::from_str(contents).map_err(|e| e.message().to_string())?;
        let config = Self {
            bind_addr: SocketAddr::new(file.server_ip, file.server_port),
            number_of_accounts: file.number_of_accounts,
            initial_balance: file.initial_balance,
        };
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), String> {
        if self.number_of_accounts == 0 {
            return Err("number_of_accounts must be at least 1".into());
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.number_of_accounts, 10);
        assert_eq!(config.initial_balance, 10);
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new("0.0.0.0:9000".parse().unwrap())
            .with_number_of_accounts(4)
            .with_initial_balance(250);

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.number_of_accounts, 4);
        assert_eq!(config.initial_balance, 250);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server_ip = "127.0.0.1"
server_port = 9191
number_of_accounts = 3
initial_balance = 40
number_of_transactions = 100
"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9191".parse().unwrap());
        assert_eq!(config.number_of_accounts, 3);
        assert_eq!(config.initial_balance, 40);
    }

    #[test]
    fn missing_keys_take_defaults() {
        let config = ServerConfig::from_toml_str("server_port = 8000").unwrap();
        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.number_of_accounts, 10);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ServerError::Config { .. }));
    }

    #[test]
    fn unparsable_values_are_rejected() {
        assert!(ServerConfig::from_toml_str("server_port = \"eighty\"").is_err());
        assert!(ServerConfig::from_toml_str("server_ip = \"not an ip\"").is_err());
    }

    #[test]
    fn zero_accounts_is_rejected() {
        let err = ServerConfig::from_toml_str("number_of_accounts = 0").unwrap_err();
        assert!(err.to_string().contains("number_of_accounts"));
    }
}
