//! Layout Module
//!
//! Pure index arithmetic for the slot address space and the round table.
//! Nothing here touches storage; callers validate inputs with the `check_*`
//! helpers before computing addresses.
//!
//! ## Slot Address
//! ```text
//! index = ((id << 13) + round) << stride) + offset
//!
//!   ┌──────────── id (115 bits) ────────────┬─ round (13) ─┬─ offset (stride) ─┐
//!   │                                       │              │                   │
//!   └───────────────────────────────────────┴──────────────┴───────────────────┘
//! ```
//!
//! ## Round Table Location
//! ```text
//! flat     = (stride << 115) + id
//! row      = flat / 16           (< 2^116)
//! position = id % 16             (2-byte entry at byte 2 * position)
//! ```

use alloy_primitives::U256;

use crate::error::{Result, StoreError};

/// Width of one slot in bytes
pub const SLOT_SIZE: usize = 32;

/// A single fixed-width storage cell
pub type Slot = [u8; SLOT_SIZE];

/// The all-zero slot (never-written storage reads as this)
pub const EMPTY_SLOT: Slot = [0u8; SLOT_SIZE];

/// Bits available to a feed id
pub const ID_BITS: u32 = 115;

/// Bits available to a round
pub const ROUND_BITS: u32 = 13;

/// Largest permitted stride
pub const MAX_STRIDE: u8 = 31;

/// Bits available to a round table row index
pub const ROW_BITS: u32 = 116;

/// Round table entries packed into one row
pub const ROW_ENTRIES: usize = 16;

/// Width of a single round table entry in bytes
pub const ROUND_ENTRY_SIZE: usize = 2;

/// Exclusive upper bound of feed ids
pub const ID_LIMIT: u128 = 1 << ID_BITS;

/// Exclusive upper bound of rounds
pub const ROUND_LIMIT: u16 = 1 << ROUND_BITS;

/// Exclusive upper bound of round table row indices
pub const ROW_LIMIT: u128 = 1 << ROW_BITS;

// =============================================================================
// Address Computation
// =============================================================================

/// Compute the flat slot index of `offset` within a feed's allocation for `round`.
///
/// The caller must have validated `id`, `stride`, `round` and `offset < 2^stride`.
pub fn slot_address(id: u128, stride: u8, round: u16, offset: u32) -> U256 {
    let feed_round = (U256::from(id) << (ROUND_BITS as usize)) + U256::from(round);
    (feed_round << (stride as usize)) + U256::from(offset)
}

/// Base slot index of a feed round (offset 0)
pub fn feed_base(id: u128, stride: u8, round: u16) -> U256 {
    slot_address(id, stride, round, 0)
}

/// Compute the round table `(row, position)` holding the latest round of a feed.
pub fn round_table_location(id: u128, stride: u8) -> (u128, usize) {
    let flat = (u128::from(stride) << ID_BITS) + id;
    (flat / ROW_ENTRIES as u128, (id % ROW_ENTRIES as u128) as usize)
}

/// Pack a feed id and round into the write-request feed index (`id * 2^13 + round`)
pub fn feed_index(id: u128, round: u16) -> u128 {
    (id << ROUND_BITS) + u128::from(round)
}

/// Split a write-request feed index back into `(id, round)`
pub fn split_feed_index(index: u128) -> (u128, u16) {
    (index >> ROUND_BITS, (index & (ROUND_LIMIT as u128 - 1)) as u16)
}

/// Number of slots allocated to one round of a feed
pub fn slots_per_round(stride: u8) -> u64 {
    1u64 << stride
}

/// Byte capacity of one round of a feed
pub fn capacity_bytes(stride: u8) -> u64 {
    slots_per_round(stride) * SLOT_SIZE as u64
}

// =============================================================================
// Range Checks
// =============================================================================

pub fn check_id(id: u128) -> Result<()> {
    if id >= ID_LIMIT {
        return Err(StoreError::range(format!("feed id {} must be below 2^{}", id, ID_BITS)));
    }
    Ok(())
}

pub fn check_stride(stride: u8) -> Result<()> {
    if stride > MAX_STRIDE {
        return Err(StoreError::range(format!(
            "stride {} exceeds maximum {}",
            stride, MAX_STRIDE
        )));
    }
    Ok(())
}

pub fn check_round(round: u16) -> Result<()> {
    if round >= ROUND_LIMIT {
        return Err(StoreError::range(format!(
            "round {} must be below {}",
            round, ROUND_LIMIT
        )));
    }
    Ok(())
}

pub fn check_row(row: u128) -> Result<()> {
    if row >= ROW_LIMIT {
        return Err(StoreError::range(format!(
            "round table row {} must be below 2^{}",
            row, ROW_BITS
        )));
    }
    Ok(())
}

/// Check `offset + count <= 2^stride`. Stride must already be valid.
pub fn check_range(stride: u8, offset: u32, count: u64) -> Result<()> {
    let limit = slots_per_round(stride);
    let end = u64::from(offset) + count;
    if end > limit {
        return Err(StoreError::range(format!(
            "slots [{}, {}) exceed the {} slots of stride {}",
            offset, end, limit, stride
        )));
    }
    Ok(())
}

/// Validate a feed address triple in one go
pub fn check_feed(id: u128, stride: u8, round: u16) -> Result<()> {
    check_id(id)?;
    check_stride(stride)?;
    check_round(round)
}
