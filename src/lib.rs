//! # FeedStore
//!
//! A round-versioned, multi-width storage engine for oracle data feeds:
//! - Feeds addressed by `(id, stride)`, each round owning `2^stride` slots
//! - A packed round table for O(1) "latest round" lookups
//! - Atomic write batches ordered by a strictly increasing block number
//! - A compact, non-self-describing binary protocol
//! - An upgrade proxy that swaps logic while keeping storage in place
//! - Write-Ahead Logging (WAL) of committed batches for crash recovery
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Upgrade Proxy                              │
//! │       (admin tag vs. read/write tags, current logic)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ Write Path  │          │  Read Path  │
//!   │ (+ Access)  │          │             │
//!   └──────┬──────┘          └──────┬──────┘
//!          │                        │
//!          ▼                        ▼
//!   ┌─────────────┐          ┌─────────────────────────────┐
//!   │     WAL     │─────────▶│  Slot Storage + Round Table │
//!   │  (Append)   │          │          (RwLock)           │
//!   └─────────────┘          └─────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod layout;
pub mod storage;
pub mod access;
pub mod store;
pub mod proxy;
pub mod events;
pub mod wal;
pub mod network;
pub mod protocol;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StoreError, Result};
pub use config::Config;
pub use engine::Engine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of FeedStore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
