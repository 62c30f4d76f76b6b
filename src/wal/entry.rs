//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::layout::Slot;
use crate::protocol::AdminCommand;
use crate::storage::Commit;

/// Entry header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Upper bound on a single entry body, enforced on append and on read
pub const MAX_ENTRY_SIZE: usize = 256 * 1024 * 1024;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// A committed write batch
    Commit {
        block_number: u64,
        slots: Vec<([u8; 32], Slot)>,
        rows: Vec<(u128, Slot)>,
    },

    /// A writer granted or revoked by the access control owner
    SetWriter { writer: [u8; 20], allowed: bool },

    /// The proxy admin role handed over
    ChangeAdmin { admin: [u8; 20] },

    /// The proxy switched implementation
    UpgradeTo { implementation: [u8; 20] },
}

impl Operation {
    /// Log form of a staged commit
    pub fn commit(commit: &Commit) -> Self {
        Operation::Commit {
            block_number: commit.block_number,
            slots: commit
                .slots
                .iter()
                .map(|(index, value)| (index.to_be_bytes::<32>(), *value))
                .collect(),
            rows: commit.rows.clone(),
        }
    }

    /// Log form of a writer-set change
    pub fn set_writer(writer: &Address, allowed: bool) -> Self {
        Operation::SetWriter {
            writer: writer.0 .0,
            allowed,
        }
    }

    /// Log form of a proxy admin command
    pub fn admin(command: &AdminCommand) -> Self {
        match command {
            AdminCommand::ChangeAdmin(admin) => Operation::ChangeAdmin { admin: admin.0 .0 },
            AdminCommand::UpgradeTo(implementation) => Operation::UpgradeTo {
                implementation: implementation.0 .0,
            },
        }
    }

    /// Rebuild the command of an admin operation
    pub fn to_admin(&self) -> Option<AdminCommand> {
        match self {
            Operation::ChangeAdmin { admin } => {
                Some(AdminCommand::ChangeAdmin(Address::from(*admin)))
            }
            Operation::UpgradeTo { implementation } => {
                Some(AdminCommand::UpgradeTo(Address::from(*implementation)))
            }
            _ => None,
        }
    }

    /// Rebuild the commit of a `Commit` operation
    pub fn to_commit(&self) -> Option<Commit> {
        match self {
            Operation::Commit {
                block_number,
                slots,
                rows,
            } => Some(Commit {
                block_number: *block_number,
                slots: slots
                    .iter()
                    .map(|(index, value)| (U256::from_be_bytes(*index), *value))
                    .collect(),
                rows: rows.clone(),
            }),
            _ => None,
        }
    }
}

impl WalEntry {
    /// Create an entry stamped with the current time
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    /// Encode header and body as they appear on disk
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let data = bincode::serialize(self)?;
        Self::check_body_len(data.len())?;
        let len = data.len() as u32;

        let mut bytes = Vec::with_capacity(HEADER_SIZE + data.len());
        bytes.extend_from_slice(&self.lsn.to_le_bytes());
        bytes.extend_from_slice(&Self::compute_crc(&data).to_le_bytes());
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(&data);
        Ok(bytes)
    }

    /// Reject bodies the reader would take for a damaged header
    pub fn check_body_len(len: usize) -> Result<()> {
        if len > MAX_ENTRY_SIZE {
            return Err(StoreError::Serialization(format!(
                "WAL entry of {} bytes exceeds the {} byte limit",
                len, MAX_ENTRY_SIZE
            )));
        }
        Ok(())
    }

    /// Decode the body of an entry after its checksum has been verified
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }

    /// CRC32 of an entry body
    pub fn compute_crc(data: &[u8]) -> u32 {
        crc32fast::hash(data)
    }
}
