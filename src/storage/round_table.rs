//! Round Table
//!
//! Packs the latest round of 16 feeds sharing a stride into one row.
//!
//! ```text
//! ┌────┬────┬────┬─────┬─────┐
//! │ p0 │ p1 │ p2 │ ... │ p15 │   each entry: u16 big-endian
//! └────┴────┴────┴─────┴─────┘
//!  0    2    4          30    byte offset
//! ```
//!
//! Rows are shared, so every update is a read-modify-write of the whole row.

use crate::error::Result;
use crate::layout::{self, Slot, ROUND_ENTRY_SIZE};

use super::SlotStorage;

/// Accessors over the round table rows of a [`SlotStorage`]
pub struct RoundTable;

impl RoundTable {
    /// Latest round recorded for `(stride, id)`, 0 if never written
    pub fn get(storage: &SlotStorage, stride: u8, id: u128) -> Result<u16> {
        layout::check_stride(stride)?;
        layout::check_id(id)?;

        let (row, position) = layout::round_table_location(id, stride);
        Ok(Self::entry(&storage.row(row), position))
    }

    /// Record `round` as the latest round of `(stride, id)`
    ///
    /// The other 15 entries of the row are left untouched. No ordering is
    /// enforced between the stored round and the new one.
    pub fn set(storage: &mut SlotStorage, stride: u8, id: u128, round: u16) -> Result<()> {
        layout::check_feed(id, stride, round)?;

        let (row, position) = layout::round_table_location(id, stride);
        layout::check_row(row)?;

        let updated = Self::with_entry(storage.row(row), position, round);
        storage.put_row(row, updated);
        Ok(())
    }

    /// Extract the entry at `position` from a packed row
    pub fn entry(row: &Slot, position: usize) -> u16 {
        let start = position * ROUND_ENTRY_SIZE;
        u16::from_be_bytes([row[start], row[start + 1]])
    }

    /// Return `row` with the entry at `position` replaced
    pub fn with_entry(mut row: Slot, position: usize, round: u16) -> Slot {
        let start = position * ROUND_ENTRY_SIZE;
        row[start..start + ROUND_ENTRY_SIZE].copy_from_slice(&round.to_be_bytes());
        row
    }
}
