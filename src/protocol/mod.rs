//! Protocol Module
//!
//! Defines the byte-oriented request/response protocol of the store and the
//! TCP framing around it.
//!
//! ## Request Tags
//! - 0x00: ADMIN                      - Op (1) + Address (20)
//! - 0x01: WRITE                      - Block (8) + Count (4) + feeds + rows
//! - 0x81: LATEST_ROUND               - Stride (1) + Id (15)
//! - 0x82: LATEST_SINGLE_FEED         - Stride (1, zero) + Id (15)
//! - 0x83: LATEST_SINGLE_FEED_ROUND   - Stride (1, zero) + Id (15)
//! - 0x84: LATEST_FEED                - Stride + Id + Offset (4) + Count (4)
//! - 0x85: LATEST_FEED_ROUND          - Stride + Id + Offset (4) + Count (4)
//! - 0x86: FEED_AT_ROUND              - Stride + Id + Round (2) + Offset + Count
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: UNAUTHORIZED
//! - 0x02: OUT_OF_ORDER
//! - 0x03: OUT_OF_RANGE
//! - 0x04: OVER_CAPACITY
//! - 0x05: ADMIN_ACCESS
//! - 0x06: BAD_IMPLEMENTATION
//! - 0x07: MALFORMED
//! - 0x08: ERROR

mod command;
mod response;
mod codec;

pub use command::{
    AdminCommand, FeedWrite, ReadQuery, Request, RequestTag, RowWrite, SlotRange, WriteBatch,
};
pub use response::{Response, Status};
pub use codec::{
    decode_admin, decode_read, decode_request, decode_response, decode_round, decode_write,
    encode_admin, encode_read, encode_request, encode_response, encode_round, encode_write,
    read_request, read_response, write_request, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
    REQUEST_HEADER_SIZE,
};
