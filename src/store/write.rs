//! Write Path
//!
//! Validates a write batch against the current storage and stages every
//! mutation into a [`Commit`]. Nothing is mutated here; the engine appends the
//! commit to the journal and applies it under the write lock, so a batch
//! either lands completely or not at all.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};

use crate::access::AccessControl;
use crate::error::{Result, StoreError};
use crate::layout::{self, Slot, EMPTY_SLOT, SLOT_SIZE};
use crate::protocol::{FeedWrite, WriteBatch};
use crate::storage::{Commit, RoundTable, SlotStorage};

/// Validate `batch` and stage it as a commit
///
/// Steps:
/// 1. Caller must be an authorized writer
/// 2. Block number must exceed LastBlockNumber
/// 3. Every feed and explicit row must be in range and within capacity
/// 4. Stage data slots
/// 5. Stage merged round table rows
pub fn prepare_batch(
    storage: &SlotStorage,
    access: &AccessControl,
    caller: &Address,
    batch: &WriteBatch,
) -> Result<Commit> {
    // Step 1: Authorization
    access.check_writer(caller)?;

    // Step 2: Ordering
    let last_block_number = storage.last_block_number();
    if batch.block_number <= last_block_number {
        return Err(StoreError::Ordering {
            block_number: batch.block_number,
            last_block_number,
        });
    }

    // Step 3: Validate the whole batch before staging anything
    for feed in &batch.feeds {
        validate_feed(feed)?;
    }
    for row in &batch.rows {
        layout::check_row(row.index)?;
    }

    // Step 4: Data slots
    let mut slots: BTreeMap<U256, Slot> = BTreeMap::new();
    for feed in &batch.feeds {
        stage_slots(storage, feed, &mut slots);
    }
    let mut commit = Commit::new(batch.block_number);
    commit.slots = slots.into_iter().collect();

    // Step 5: Round table rows
    commit.rows = stage_rows(storage, batch)?;

    tracing::debug!(
        block_number = batch.block_number,
        feeds = batch.feeds.len(),
        slots = commit.slots.len(),
        rows = commit.rows.len(),
        "Staged write batch"
    );

    Ok(commit)
}

/// Range and capacity checks for a single feed update
pub fn validate_feed(feed: &FeedWrite) -> Result<()> {
    layout::check_feed(feed.id, feed.stride, feed.round)?;

    let capacity = layout::capacity_bytes(feed.stride);
    let len = feed.data.len() as u64;
    if len > capacity {
        return Err(StoreError::Capacity {
            len,
            capacity,
            stride: feed.stride,
        });
    }
    Ok(())
}

/// Split feed data into slots starting at offset 0
///
/// The last data slot is zero-padded on the right. Slots of the feed round
/// past the data are cleared if storage or an earlier feed in the batch holds
/// anything there.
fn stage_slots(storage: &SlotStorage, feed: &FeedWrite, slots: &mut BTreeMap<U256, Slot>) {
    let base = layout::feed_base(feed.id, feed.stride, feed.round);
    let mut covered = 0u64;

    for chunk in feed.data.chunks(SLOT_SIZE) {
        let mut slot = EMPTY_SLOT;
        slot[..chunk.len()].copy_from_slice(chunk);

        slots.insert(base + U256::from(covered), slot);
        covered += 1;
    }

    let tail = base + U256::from(covered);
    let end = base + (U256::from(1u8) << (feed.stride as usize));
    let stale: Vec<U256> = storage
        .written_in(tail, end)
        .chain(slots.range(tail..end).map(|(index, _)| *index))
        .collect();
    for index in stale {
        slots.insert(index, EMPTY_SLOT);
    }
}

/// Merge explicit rows and feed rounds into one rewrite per row
///
/// Explicit rows are taken as full replacements first. Each feed round is then
/// spliced into the staged row, or the stored row if the batch has not touched
/// it yet, so siblings sharing a row survive.
fn stage_rows(storage: &SlotStorage, batch: &WriteBatch) -> Result<Vec<(u128, Slot)>> {
    let mut staged: BTreeMap<u128, Slot> = BTreeMap::new();

    for row in &batch.rows {
        staged.insert(row.index, row.row);
    }

    for feed in &batch.feeds {
        let (row, position) = layout::round_table_location(feed.id, feed.stride);
        layout::check_row(row)?;

        let current = staged.get(&row).copied().unwrap_or_else(|| storage.row(row));
        staged.insert(row, RoundTable::with_entry(current, position, feed.round));
    }

    Ok(staged.into_iter().collect())
}
