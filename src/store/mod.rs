//! Store Module
//!
//! The store's behaviour, separated from the storage it runs against.
//!
//! ## Responsibilities
//! - Write path: validate a batch and stage it as a [`Commit`]
//! - Read path: answer queries without touching state
//! - [`StoreLogic`]: the seam the upgrade proxy forwards through
//!
//! Storage is owned by whoever hosts the logic (the engine), so swapping
//! the logic leaves every slot and round table row in place.

pub mod read;
pub mod write;

use alloy_primitives::Address;

use crate::access::AccessControl;
use crate::error::Result;
use crate::protocol::{ReadQuery, WriteBatch};
use crate::storage::{Commit, SlotStorage};

/// An implementation the proxy can point at
///
/// Implementations are stateless with respect to feed data: every call gets
/// the proxy-owned storage passed in.
pub trait StoreLogic: Send + Sync {
    /// Human readable version label (for logs)
    fn name(&self) -> &str;

    /// Validate a write batch and stage its mutations
    fn prepare_write(
        &self,
        storage: &SlotStorage,
        access: &AccessControl,
        caller: &Address,
        batch: &WriteBatch,
    ) -> Result<Commit>;

    /// Answer a read query with its wire response
    fn read(&self, storage: &SlotStorage, query: &ReadQuery) -> Result<Vec<u8>>;
}

/// The built-in implementation backed by [`write`] and [`read`]
#[derive(Debug, Clone)]
pub struct StandardLogic {
    name: String,
}

impl StandardLogic {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for StandardLogic {
    fn default() -> Self {
        Self::new(concat!("feedstore-", env!("CARGO_PKG_VERSION")))
    }
}

impl StoreLogic for StandardLogic {
    fn name(&self) -> &str {
        &self.name
    }

    fn prepare_write(
        &self,
        storage: &SlotStorage,
        access: &AccessControl,
        caller: &Address,
        batch: &WriteBatch,
    ) -> Result<Commit> {
        write::prepare_batch(storage, access, caller, batch)
    }

    fn read(&self, storage: &SlotStorage, query: &ReadQuery) -> Result<Vec<u8>> {
        read::execute(storage, query)
    }
}
