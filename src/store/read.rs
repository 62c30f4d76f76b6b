//! Read Path
//!
//! Point and ranged queries against current or historical rounds. Every
//! function takes `&SlotStorage` and never mutates it.

use alloy_primitives::U256;

use crate::error::{Result, StoreError};
use crate::layout::{self, SLOT_SIZE};
use crate::protocol::{encode_round, ReadQuery, SlotRange, MAX_PAYLOAD_SIZE};
use crate::storage::{RoundTable, SlotStorage};

/// Largest number of slots a single read may return
///
/// One slot of headroom is kept for the round prefix of the "AndRound" forms.
pub const MAX_READ_SLOTS: u64 = MAX_PAYLOAD_SIZE as u64 / SLOT_SIZE as u64 - 1;

/// Latest round of `(stride, id)`, 0 if never written
pub fn get_latest_round(storage: &SlotStorage, stride: u8, id: u128) -> Result<u16> {
    RoundTable::get(storage, stride, id)
}

/// Latest value of a single-slot feed (stride 0)
pub fn get_latest_single_feed(storage: &SlotStorage, id: u128) -> Result<Vec<u8>> {
    get_latest_feed(storage, 0, id, SlotRange::FULL)
}

/// Latest value of a single-slot feed with its round
pub fn get_latest_single_feed_and_round(storage: &SlotStorage, id: u128) -> Result<(u16, Vec<u8>)> {
    get_latest_feed_and_round(storage, 0, id, SlotRange::FULL)
}

/// Slots `range` of the feed's latest round
pub fn get_latest_feed(
    storage: &SlotStorage,
    stride: u8,
    id: u128,
    range: SlotRange,
) -> Result<Vec<u8>> {
    get_latest_feed_and_round(storage, stride, id, range).map(|(_, data)| data)
}

/// Slots `range` of the feed's latest round, with that round
pub fn get_latest_feed_and_round(
    storage: &SlotStorage,
    stride: u8,
    id: u128,
    range: SlotRange,
) -> Result<(u16, Vec<u8>)> {
    let round = RoundTable::get(storage, stride, id)?;
    let data = get_feed_at_round(storage, stride, id, round, range)?;
    Ok((round, data))
}

/// Slots `range` of the feed at an explicit historical round
pub fn get_feed_at_round(
    storage: &SlotStorage,
    stride: u8,
    id: u128,
    round: u16,
    range: SlotRange,
) -> Result<Vec<u8>> {
    layout::check_feed(id, stride, round)?;
    let count = resolve_count(stride, range)?;

    let base = layout::feed_base(id, stride, round);
    let mut out = Vec::with_capacity(count as usize * SLOT_SIZE);
    for i in 0..count {
        let index = base + U256::from(u64::from(range.offset) + i);
        out.extend_from_slice(&storage.slot(&index));
    }
    Ok(out)
}

/// Answer a decoded query with its wire response
pub fn execute(storage: &SlotStorage, query: &ReadQuery) -> Result<Vec<u8>> {
    match *query {
        ReadQuery::LatestRound { stride, id } => {
            let round = get_latest_round(storage, stride, id)?;
            Ok(encode_round(round).to_vec())
        }
        ReadQuery::LatestSingleFeed { id } => get_latest_single_feed(storage, id),
        ReadQuery::LatestSingleFeedAndRound { id } => {
            let (round, data) = get_latest_single_feed_and_round(storage, id)?;
            Ok(with_round(round, data))
        }
        ReadQuery::LatestFeed { stride, id, range } => get_latest_feed(storage, stride, id, range),
        ReadQuery::LatestFeedAndRound { stride, id, range } => {
            let (round, data) = get_latest_feed_and_round(storage, stride, id, range)?;
            Ok(with_round(round, data))
        }
        ReadQuery::FeedAtRound {
            stride,
            id,
            round,
            range,
        } => get_feed_at_round(storage, stride, id, round, range),
    }
}

/// Turn an optional count into a concrete slot count and bounds-check it
fn resolve_count(stride: u8, range: SlotRange) -> Result<u64> {
    let total = layout::slots_per_round(stride);
    let offset = u64::from(range.offset);
    if offset >= total {
        return Err(StoreError::range(format!(
            "offset {} outside the {} slots of stride {}",
            offset, total, stride
        )));
    }

    let count = match range.count {
        0 => total - offset,
        n => u64::from(n),
    };
    layout::check_range(stride, range.offset, count)?;

    if count > MAX_READ_SLOTS {
        return Err(StoreError::range(format!(
            "read of {} slots exceeds the {} slot response limit",
            count, MAX_READ_SLOTS
        )));
    }
    Ok(count)
}

fn with_round(round: u16, data: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(SLOT_SIZE + data.len());
    out.extend_from_slice(&encode_round(round));
    out.extend_from_slice(&data);
    out
}
