//! FeedStore Server Binary
//!
//! Starts the TCP server for FeedStore.

use std::sync::Arc;

use alloy_primitives::Address;
use clap::Parser;
use feedstore::config::WalSyncStrategy;
use feedstore::error::{Result, StoreError};
use feedstore::network::Server;
use feedstore::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// FeedStore Server
#[derive(Parser, Debug)]
#[command(name = "feedstore-server")]
#[command(about = "Round-versioned oracle feed store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./feedstore_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7411")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Proxy admin address (hex)
    #[arg(long)]
    admin: String,

    /// Access control owner address (hex)
    #[arg(long)]
    owner: String,

    /// Authorized writer address (hex), repeatable
    #[arg(short, long = "writer")]
    writers: Vec<String>,

    /// Address of the built-in implementation (hex)
    #[arg(long)]
    implementation: Option<String>,

    /// fsync the WAL after every batch instead of every 100
    #[arg(long)]
    sync_every_write: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,feedstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("FeedStore Server v{}", feedstore::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    let config = match build_config(&args) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    // Open engine
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        last_block_number = engine.last_block_number(),
        admin = %engine.admin_address(),
        "Engine initialized successfully"
    );

    let server = match Server::bind(config, engine) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

fn build_config(args: &Args) -> Result<Config> {
    // Never fall back to the well-known default identities on a listening server
    let mut builder = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .admin(parse_address(&args.admin)?)
        .owner(parse_address(&args.owner)?);

    if let Some(implementation) = &args.implementation {
        builder = builder.implementation(parse_address(implementation)?);
    }
    for writer in &args.writers {
        builder = builder.writer(parse_address(writer)?);
    }
    if args.sync_every_write {
        builder = builder.wal_sync_strategy(WalSyncStrategy::EveryWrite);
    }

    Ok(builder.build())
}

fn parse_address(s: &str) -> Result<Address> {
    s.parse::<Address>()
        .map_err(|e| StoreError::Config(format!("invalid address {:?}: {}", s, e)))
}
