//! Configuration for FeedStore
//!
//! Centralized configuration with sensible defaults.
//!
//! ## Trust boundary
//! The caller identity of a request is taken from its frame and is not
//! authenticated. Whoever can reach the listen address can claim any
//! identity, including the admin and owner. The default admin (`0x…ad`) and
//! owner (`0x…0e`) are well known and only fit tests and local use;
//! `feedstore-server` requires both to be given explicitly. Expose the port
//! only behind something that authenticates callers.

use std::path::PathBuf;

use alloy_primitives::Address;

/// Main configuration for a FeedStore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     └── wal.log          (journal of committed batches)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the journal
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // Identity Configuration
    // -------------------------------------------------------------------------
    /// Proxy admin: may only upgrade or hand over the admin role
    pub admin: Address,

    /// Access control owner: may grant and revoke writers
    pub owner: Address,

    /// Writers authorized at startup
    pub writers: Vec<Address>,

    /// Address the built-in store implementation is deployed at
    pub implementation: Address,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./feedstore_data"),
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            admin: Address::with_last_byte(0xad),
            owner: Address::with_last_byte(0x0e),
            writers: Vec::new(),
            implementation: Address::with_last_byte(0x01),
            listen_addr: "127.0.0.1:7411".to_string(),
            max_connections: 1024,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the proxy admin identity
    pub fn admin(mut self, admin: Address) -> Self {
        self.config.admin = admin;
        self
    }

    /// Set the access control owner
    pub fn owner(mut self, owner: Address) -> Self {
        self.config.owner = owner;
        self
    }

    /// Authorize an additional writer at startup
    pub fn writer(mut self, writer: Address) -> Self {
        self.config.writers.push(writer);
        self
    }

    /// Set the address of the built-in implementation
    pub fn implementation(mut self, address: Address) -> Self {
        self.config.implementation = address;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
