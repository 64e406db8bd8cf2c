//! Configuration Module
//!
//! This module defines all configuration structures for the ledger service.
//! Configuration is loaded from TOML files and parsed using serde.

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::fs;

/// Main configuration structure
///
/// Contains all configuration sections for the ledger service.
/// Loaded from a TOML file (e.g., config/default.toml).
///
/// # Example TOML
/// ```toml
/// [ledger]
/// house_address = "0x000000000000000000000000000000000000a11c"
/// require_custody_escrow = false
///
/// [api]
/// host = "127.0.0.1"
/// port = 8545
///
/// [journal]
/// enabled = true
/// url = "sqlite://ledger.db"
///
/// [events]
/// channel_capacity = 1024
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ledger: LedgerConfig,
    pub api: ApiConfig,
    pub journal: JournalConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

/// Ledger state machine configuration
///
/// # Fields
/// - `house_address`: Identity the auction house uses as a batch custodian
/// - `require_custody_escrow`: Reject `createAuction` unless the house already
///   holds custody of the batch. Off by default, matching deployed behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub house_address: Address,
    #[serde(default)]
    pub require_custody_escrow: bool,
}

/// API server configuration
///
/// Controls the JSON-RPC API endpoint settings.
///
/// # Fields
/// - `host`: IP address to bind to (e.g., "127.0.0.1" or "0.0.0.0")
/// - `port`: TCP port to listen on (e.g., 8545)
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

/// Journal configuration
///
/// # Fields
/// - `enabled`: Persist committed calls and replay them on startup
/// - `url`: Database connection URL (e.g., "sqlite://ledger.db")
#[derive(Debug, Clone, Deserialize)]
pub struct JournalConfig {
    pub enabled: bool,
    pub url: String,
}

/// Event broadcast configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Events buffered per subscriber before slow readers start lagging
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    /// * `Ok(Config)` if the file was successfully loaded and parsed
    /// * `Err` if the file couldn't be read or the TOML is invalid
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;

        if config.ledger.house_address.is_zero() {
            anyhow::bail!("ledger.house_address must not be the null address");
        }
        if config.events.channel_capacity == 0 {
            anyhow::bail!("events.channel_capacity must be greater than zero");
        }

        Ok(config)
    }
}
