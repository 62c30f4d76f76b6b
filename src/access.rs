//! Access Control
//!
//! The set of addresses allowed to submit write batches, administered by a
//! single owner.

use std::collections::HashSet;

use alloy_primitives::Address;

use crate::error::{Result, StoreError};

/// Authorized-writer list with a distinct owner
#[derive(Debug, Clone)]
pub struct AccessControl {
    /// The only identity allowed to change the writer set
    owner: Address,

    /// Currently authorized writers
    writers: HashSet<Address>,
}

impl AccessControl {
    /// Create an access list with no writers
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            writers: HashSet::new(),
        }
    }

    /// Create an access list with an initial writer set
    pub fn with_writers(owner: Address, writers: impl IntoIterator<Item = Address>) -> Self {
        Self {
            owner,
            writers: writers.into_iter().collect(),
        }
    }

    /// Is `address` currently an authorized writer
    pub fn is_allowed(&self, address: &Address) -> bool {
        self.writers.contains(address)
    }

    /// Fail with an authorization error unless `address` may write
    pub fn check_writer(&self, address: &Address) -> Result<()> {
        if !self.is_allowed(address) {
            return Err(StoreError::Authorization(format!(
                "{} is not an authorized writer",
                address
            )));
        }
        Ok(())
    }

    /// Grant or revoke write access. Only the owner may call this.
    pub fn set_writer(&mut self, caller: &Address, writer: Address, allowed: bool) -> Result<()> {
        self.check_owner(caller)?;
        self.apply_writer(writer, allowed);
        Ok(())
    }

    /// Fail with an authorization error unless `caller` is the owner
    pub fn check_owner(&self, caller: &Address) -> Result<()> {
        if *caller != self.owner {
            return Err(StoreError::Authorization(format!(
                "{} is not the access control owner",
                caller
            )));
        }
        Ok(())
    }

    /// Apply a writer-set change without the owner check
    ///
    /// The engine checks the owner and journals the change first; replay
    /// calls this directly.
    pub(crate) fn apply_writer(&mut self, writer: Address, allowed: bool) {
        if allowed {
            self.writers.insert(writer);
        } else {
            self.writers.remove(&writer);
        }
        tracing::info!(%writer, allowed, "Writer access updated");
    }

    /// The owner identity
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Number of authorized writers
    pub fn writer_count(&self) -> usize {
        self.writers.len()
    }
}
