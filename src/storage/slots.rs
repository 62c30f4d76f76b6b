//! Slot Storage
//!
//! Maps from index to slot. Unwritten indices read as zero, and zero slots
//! are not stored.

use std::collections::{BTreeMap, HashMap};

use alloy_primitives::U256;

use crate::layout::{Slot, EMPTY_SLOT};

/// Staged mutations of one write batch, applied all at once
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commit {
    /// New value of LastBlockNumber
    pub block_number: u64,

    /// Data slot writes in staging order
    pub slots: Vec<(U256, Slot)>,

    /// Full round table rows, one per touched row
    pub rows: Vec<(u128, Slot)>,
}

impl Commit {
    /// An empty commit that only advances the block number
    pub fn new(block_number: u64) -> Self {
        Self {
            block_number,
            slots: Vec::new(),
            rows: Vec::new(),
        }
    }
}

/// The backing store of slots and round table rows
#[derive(Debug, Default)]
pub struct SlotStorage {
    /// Data slots keyed by flat slot index, ordered for range scans
    slots: BTreeMap<U256, Slot>,

    /// Round table rows keyed by row index
    rows: HashMap<u128, Slot>,

    /// Block number of the last applied commit
    last_block_number: u64,
}

impl SlotStorage {
    /// Create an empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a data slot (zero if never written)
    pub fn slot(&self, index: &U256) -> Slot {
        self.slots.get(index).copied().unwrap_or(EMPTY_SLOT)
    }

    /// Read a round table row (zero if never written)
    pub fn row(&self, row: u128) -> Slot {
        self.rows.get(&row).copied().unwrap_or(EMPTY_SLOT)
    }

    /// Overwrite a single data slot
    pub fn put_slot(&mut self, index: U256, value: Slot) {
        if value == EMPTY_SLOT {
            self.slots.remove(&index);
        } else {
            self.slots.insert(index, value);
        }
    }

    /// Indices of stored slots in `[start, end)`
    pub fn written_in(&self, start: U256, end: U256) -> impl Iterator<Item = U256> + '_ {
        self.slots.range(start..end).map(|(index, _)| *index)
    }

    /// Overwrite a full round table row
    pub fn put_row(&mut self, row: u128, value: Slot) {
        self.rows.insert(row, value);
    }

    /// Block number of the last applied commit (0 when empty)
    pub fn last_block_number(&self) -> u64 {
        self.last_block_number
    }

    /// Apply a staged commit
    ///
    /// Validation happens before a commit is built; applying never fails.
    pub fn apply(&mut self, commit: &Commit) {
        for (index, value) in &commit.slots {
            self.put_slot(*index, *value);
        }
        for (row, value) in &commit.rows {
            self.rows.insert(*row, *value);
        }
        self.last_block_number = commit.block_number;
    }

    /// Number of nonzero data slots
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of round table rows ever written
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
