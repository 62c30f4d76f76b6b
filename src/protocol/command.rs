//! Request definitions
//!
//! Represents decoded store requests from clients.

use alloy_primitives::Address;

use crate::layout::Slot;

/// Leading tag of every request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestTag {
    Admin = 0x00,
    Write = 0x01,
    LatestRound = 0x81,
    LatestSingleFeed = 0x82,
    LatestSingleFeedAndRound = 0x83,
    LatestFeed = 0x84,
    LatestFeedAndRound = 0x85,
    FeedAtRound = 0x86,
}

impl RequestTag {
    /// Parse a tag byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(RequestTag::Admin),
            0x01 => Some(RequestTag::Write),
            0x81 => Some(RequestTag::LatestRound),
            0x82 => Some(RequestTag::LatestSingleFeed),
            0x83 => Some(RequestTag::LatestSingleFeedAndRound),
            0x84 => Some(RequestTag::LatestFeed),
            0x85 => Some(RequestTag::LatestFeedAndRound),
            0x86 => Some(RequestTag::FeedAtRound),
            _ => None,
        }
    }

    /// Is this one of the privileged proxy operations
    pub fn is_admin(self) -> bool {
        self == RequestTag::Admin
    }
}

/// One feed update inside a write batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedWrite {
    pub id: u128,
    pub stride: u8,
    pub round: u16,
    pub data: Vec<u8>,
}

impl FeedWrite {
    pub fn new(id: u128, stride: u8, round: u16, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            stride,
            round,
            data: data.into(),
        }
    }
}

/// A full round table row supplied by the writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowWrite {
    pub index: u128,
    pub row: Slot,
}

/// A batch of feed updates under one new block number
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    pub block_number: u64,
    pub feeds: Vec<FeedWrite>,
    pub rows: Vec<RowWrite>,
}

impl WriteBatch {
    /// Start an empty batch
    pub fn new(block_number: u64) -> Self {
        Self {
            block_number,
            feeds: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Append a feed update
    pub fn feed(mut self, id: u128, stride: u8, round: u16, data: impl Into<Vec<u8>>) -> Self {
        self.feeds.push(FeedWrite::new(id, stride, round, data));
        self
    }

    /// Append an explicit round table row
    pub fn row(mut self, index: u128, row: Slot) -> Self {
        self.rows.push(RowWrite { index, row });
        self
    }
}

/// Slot window within a feed round. `count == 0` reads to the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotRange {
    pub offset: u32,
    pub count: u32,
}

impl SlotRange {
    /// The whole allocation
    pub const FULL: SlotRange = SlotRange { offset: 0, count: 0 };

    pub fn new(offset: u32, count: u32) -> Self {
        Self { offset, count }
    }
}

/// A side-effect free query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadQuery {
    LatestRound {
        stride: u8,
        id: u128,
    },
    LatestSingleFeed {
        id: u128,
    },
    LatestSingleFeedAndRound {
        id: u128,
    },
    LatestFeed {
        stride: u8,
        id: u128,
        range: SlotRange,
    },
    LatestFeedAndRound {
        stride: u8,
        id: u128,
        range: SlotRange,
    },
    FeedAtRound {
        stride: u8,
        id: u128,
        round: u16,
        range: SlotRange,
    },
}

impl ReadQuery {
    pub fn tag(&self) -> RequestTag {
        match self {
            ReadQuery::LatestRound { .. } => RequestTag::LatestRound,
            ReadQuery::LatestSingleFeed { .. } => RequestTag::LatestSingleFeed,
            ReadQuery::LatestSingleFeedAndRound { .. } => RequestTag::LatestSingleFeedAndRound,
            ReadQuery::LatestFeed { .. } => RequestTag::LatestFeed,
            ReadQuery::LatestFeedAndRound { .. } => RequestTag::LatestFeedAndRound,
            ReadQuery::FeedAtRound { .. } => RequestTag::FeedAtRound,
        }
    }
}

/// Privileged proxy operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    /// Switch the implementation the proxy forwards to
    UpgradeTo(Address),

    /// Hand the admin role to another identity
    ChangeAdmin(Address),
}

impl AdminCommand {
    pub const UPGRADE_TO: u8 = 0x01;
    pub const CHANGE_ADMIN: u8 = 0x02;

    pub fn op_byte(&self) -> u8 {
        match self {
            AdminCommand::UpgradeTo(_) => Self::UPGRADE_TO,
            AdminCommand::ChangeAdmin(_) => Self::CHANGE_ADMIN,
        }
    }
}

/// A decoded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Admin(AdminCommand),
    Write(WriteBatch),
    Read(ReadQuery),
}

impl Request {
    /// Get the request tag
    pub fn tag(&self) -> RequestTag {
        match self {
            Request::Admin(_) => RequestTag::Admin,
            Request::Write(_) => RequestTag::Write,
            Request::Read(query) => query.tag(),
        }
    }
}
