//! Storage Module
//!
//! The physical state of the store: a sparse slot space, the round table
//! rows, and the last committed block number.
//!
//! ## Responsibilities
//! - Hold slot contents keyed by flat 256-bit index
//! - Hold round table rows keyed by row index
//! - Apply a staged `Commit` in one step
//!
//! ## Layout
//! ```text
//! ┌────────────────────────────────────────┐
//! │ Data slots    U256  → [u8; 32]         │
//! ├────────────────────────────────────────┤
//! │ Round table   row   → [u8; 32]         │
//! │   16 × u16 (big-endian) per row        │
//! ├────────────────────────────────────────┤
//! │ LastBlockNumber (u64)                  │
//! └────────────────────────────────────────┘
//! ```
//!
//! Storage knows nothing about feeds or rounds; addressing lives in
//! [`crate::layout`] and validation in [`crate::store`].

mod round_table;
mod slots;

pub use round_table::RoundTable;
pub use slots::{Commit, SlotStorage};
