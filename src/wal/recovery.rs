//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::{Result, StoreError};
use super::{WalEntry, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries found (recovery stops at the first)
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries in order
    /// 2. Stop at the first torn or corrupted entry
    /// 3. Truncate the file after the last valid entry
    /// 4. Return all valid entries in order
    ///
    /// Batches depend on everything before them, so nothing past a damaged
    /// entry is replayed.
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let (entries, result, valid_len) = Self::scan(path)?;

        if result.entries_corrupted > 0 {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;

            tracing::warn!(
                path = %path.display(),
                valid_len,
                "Truncated WAL after last valid entry"
            );

            return Ok((
                entries,
                RecoveryResult {
                    was_truncated: true,
                    ..result
                },
            ));
        }

        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Self::scan(path).map(|(_, result, _)| result)
    }

    /// Read entries until the end or the first corruption
    fn scan(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult, u64)> {
        let mut reader = WalReader::open(path)?;
        let mut entries = Vec::new();
        let mut entries_corrupted = 0;
        let mut last_lsn = 0;
        let mut valid_len = 0;

        loop {
            match reader.next_entry() {
                Ok(Some(entry)) => {
                    if entry.lsn != last_lsn + 1 {
                        tracing::warn!(
                            expected = last_lsn + 1,
                            found = entry.lsn,
                            "WAL sequence gap"
                        );
                        entries_corrupted += 1;
                        break;
                    }
                    last_lsn = entry.lsn;
                    entries.push(entry);
                    valid_len = reader.position();
                }
                Ok(None) => break,
                Err(StoreError::WalCorruption(reason)) | Err(StoreError::Serialization(reason)) => {
                    tracing::warn!(%reason, "WAL corruption detected");
                    entries_corrupted += 1;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let result = RecoveryResult {
            entries_recovered: entries.len() as u64,
            entries_corrupted,
            last_lsn,
            was_truncated: false,
        };

        Ok((entries, result, valid_len))
    }
}
