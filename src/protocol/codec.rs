//! Protocol codec
//!
//! Encoding and decoding functions for store requests, responses and the
//! TCP frames that carry them.
//!
//! ## Request Formats
//!
//! ### Write (0x01)
//! ```text
//! ┌──────┬─────────────┬─────────────┐
//! │ 0x01 │ Block (8)   │ Count (4)   │
//! └──────┴─────────────┴─────────────┘
//! then Count feed records:
//! ┌────────────┬─────────┬───────┬─────────┬───────────┬──────┐
//! │ Stride (1) │ IdxLen  │ Index │ LenLen  │ Len       │ Data │
//! └────────────┴─────────┴───────┴─────────┴───────────┴──────┘
//!   Index = id * 2^13 + round, minimal big-endian
//! then row records until the end:
//! ┌─────────┬──────────┬────────────┐
//! │ RowLen  │ RowIndex │ Row (32)   │
//! └─────────┴──────────┴────────────┘
//! ```
//!
//! ### Read (high bit set)
//! ```text
//! ┌─────┬────────────┬─────────┬───────────┬────────────┬───────────┐
//! │ Tag │ Stride (1) │ Id (15) │ Round (2) │ Offset (4) │ Count (4) │
//! └─────┴────────────┴─────────┴───────────┴────────────┴───────────┘
//!                                 0x86 only   0x84/0x85/0x86
//! ```
//! Trailing zero bytes of the tail may be left out.
//!
//! ### Admin (0x00)
//! ```text
//! ┌──────┬────────┬──────────────┐
//! │ 0x00 │ Op (1) │ Address (20) │
//! └──────┴────────┴──────────────┘
//! ```
//!
//! ## Frames
//! ```text
//! Request:  │ Len (4) │ Caller (20) │ Payload (Len) │
//! Response: │ Status (1) │ Len (4) │ Payload (Len) │
//! ```

use std::io::{Read, Write};

use alloy_primitives::{Address, U256};
use bytes::{Buf, BufMut, BytesMut};

use super::{AdminCommand, FeedWrite, ReadQuery, Request, RequestTag, Response, RowWrite, SlotRange, Status, WriteBatch};
use crate::error::{Result, StoreError};
use crate::layout::{self, Slot, ROUND_BITS, SLOT_SIZE};

/// Response header size: 1 byte status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Request frame header size: 4 bytes length + 20 bytes caller
pub const REQUEST_HEADER_SIZE: usize = 24;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Bytes of the feed id in a read request
pub const READ_ID_SIZE: usize = 15;

/// Fixed part of a read request after the tag: stride + id
const READ_HEADER_SIZE: usize = 1 + READ_ID_SIZE;

/// Fixed part of a write request after the tag: block number + feed count
const WRITE_HEADER_SIZE: usize = 12;

/// Longest permitted index field in a write request
const MAX_INDEX_BYTES: usize = 32;

/// Longest permitted data length field in a write request
const MAX_LENGTH_BYTES: usize = 8;

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request to bytes
pub fn encode_request(request: &Request) -> Vec<u8> {
    match request {
        Request::Admin(command) => encode_admin(command),
        Request::Write(batch) => encode_write(batch),
        Request::Read(query) => encode_read(query),
    }
}

/// Decode a request from bytes
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    let (&tag_byte, body) = bytes
        .split_first()
        .ok_or_else(|| StoreError::Protocol("Empty request".to_string()))?;

    let tag = RequestTag::from_byte(tag_byte).ok_or_else(|| {
        StoreError::Protocol(format!("Unknown request tag: 0x{:02x}", tag_byte))
    })?;

    match tag {
        RequestTag::Admin => decode_admin(body).map(Request::Admin),
        RequestTag::Write => decode_write(body).map(Request::Write),
        _ => decode_read(tag, body).map(Request::Read),
    }
}

/// Encode a write batch
///
/// Feed indices and data lengths are written in their shortest big-endian
/// form; explicit rows follow the feed records.
pub fn encode_write(batch: &WriteBatch) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(1 + WRITE_HEADER_SIZE + batch.feeds.len() * 48);
    buf.put_u8(RequestTag::Write as u8);
    buf.put_u64(batch.block_number);
    buf.put_u32(batch.feeds.len() as u32);

    for feed in &batch.feeds {
        let index = (U256::from(feed.id) << (ROUND_BITS as usize)) + U256::from(feed.round);
        let index_bytes = index.to_be_bytes::<32>();
        let len_bytes = (feed.data.len() as u64).to_be_bytes();

        buf.put_u8(feed.stride);
        put_minimal(&mut buf, &index_bytes);
        put_minimal(&mut buf, &len_bytes);
        buf.put_slice(&feed.data);
    }

    for row in &batch.rows {
        put_minimal(&mut buf, &row.index.to_be_bytes());
        buf.put_slice(&row.row);
    }

    buf.to_vec()
}

/// Decode a write batch body (tag already stripped)
pub fn decode_write(body: &[u8]) -> Result<WriteBatch> {
    let mut buf = body;
    if buf.remaining() < WRITE_HEADER_SIZE {
        return Err(StoreError::Protocol(format!(
            "Write request: incomplete header (expected {} bytes, got {})",
            WRITE_HEADER_SIZE,
            buf.remaining()
        )));
    }

    let block_number = buf.get_u64();
    let feed_count = buf.get_u32() as usize;

    let mut feeds = Vec::with_capacity(feed_count.min(buf.remaining()));
    for _ in 0..feed_count {
        let stride = take(&mut buf, 1, "feed stride")?[0];

        let index_len = take(&mut buf, 1, "feed index length")?[0] as usize;
        if index_len > MAX_INDEX_BYTES {
            return Err(StoreError::Protocol(format!(
                "Write request: feed index of {} bytes (max {})",
                index_len, MAX_INDEX_BYTES
            )));
        }
        let index = be_to_u128(take(&mut buf, index_len, "feed index")?)
            .ok_or_else(|| StoreError::range("feed index must be below 2^128"))?;
        let (id, round) = layout::split_feed_index(index);

        let length_len = take(&mut buf, 1, "data length size")?[0] as usize;
        if length_len > MAX_LENGTH_BYTES {
            return Err(StoreError::Protocol(format!(
                "Write request: data length field of {} bytes (max {})",
                length_len, MAX_LENGTH_BYTES
            )));
        }
        let data_len = be_to_u64(take(&mut buf, length_len, "data length")?);
        if data_len > buf.remaining() as u64 {
            return Err(StoreError::Protocol(format!(
                "Write request: data of {} bytes but only {} remain",
                data_len,
                buf.remaining()
            )));
        }
        let data = take(&mut buf, data_len as usize, "feed data")?.to_vec();

        feeds.push(FeedWrite {
            id,
            stride,
            round,
            data,
        });
    }

    let mut rows = Vec::new();
    while buf.has_remaining() {
        let index_len = take(&mut buf, 1, "row index length")?[0] as usize;
        if index_len > MAX_INDEX_BYTES {
            return Err(StoreError::Protocol(format!(
                "Write request: row index of {} bytes (max {})",
                index_len, MAX_INDEX_BYTES
            )));
        }
        let index = be_to_u128(take(&mut buf, index_len, "row index")?)
            .ok_or_else(|| StoreError::range("round table row must be below 2^116"))?;

        let mut row: Slot = [0u8; SLOT_SIZE];
        row.copy_from_slice(take(&mut buf, SLOT_SIZE, "row contents")?);
        rows.push(RowWrite { index, row });
    }

    Ok(WriteBatch {
        block_number,
        feeds,
        rows,
    })
}

/// Encode a read query, leaving out trailing all-zero fields
///
/// Ids occupy 15 bytes on the wire; bits above 2^120 are not representable.
pub fn encode_read(query: &ReadQuery) -> Vec<u8> {
    let (stride, id) = match *query {
        ReadQuery::LatestRound { stride, id } => (stride, id),
        ReadQuery::LatestSingleFeed { id } | ReadQuery::LatestSingleFeedAndRound { id } => (0, id),
        ReadQuery::LatestFeed { stride, id, .. }
        | ReadQuery::LatestFeedAndRound { stride, id, .. }
        | ReadQuery::FeedAtRound { stride, id, .. } => (stride, id),
    };

    let mut buf = BytesMut::with_capacity(1 + READ_HEADER_SIZE + 10);
    buf.put_u8(query.tag() as u8);
    buf.put_u8(stride);
    buf.put_slice(&id.to_be_bytes()[16 - READ_ID_SIZE..]);

    let mut tail: Vec<Vec<u8>> = Vec::new();
    match *query {
        ReadQuery::LatestFeed { range, .. } | ReadQuery::LatestFeedAndRound { range, .. } => {
            tail.push(range.offset.to_be_bytes().to_vec());
            tail.push(range.count.to_be_bytes().to_vec());
        }
        ReadQuery::FeedAtRound { round, range, .. } => {
            tail.push(round.to_be_bytes().to_vec());
            tail.push(range.offset.to_be_bytes().to_vec());
            tail.push(range.count.to_be_bytes().to_vec());
        }
        _ => {}
    }

    while tail.last().is_some_and(|field| field.iter().all(|&b| b == 0)) {
        tail.pop();
    }
    for field in tail {
        buf.put_slice(&field);
    }

    buf.to_vec()
}

/// Decode a read query body (tag already stripped)
pub fn decode_read(tag: RequestTag, body: &[u8]) -> Result<ReadQuery> {
    if body.len() < READ_HEADER_SIZE {
        return Err(StoreError::Protocol(format!(
            "Read request: incomplete header (expected {} bytes, got {})",
            READ_HEADER_SIZE,
            body.len()
        )));
    }

    let mut buf = body;
    let stride = buf.get_u8();
    let mut id_bytes = [0u8; 16];
    buf.copy_to_slice(&mut id_bytes[16 - READ_ID_SIZE..]);
    let id = u128::from_be_bytes(id_bytes);

    let tail_len = match tag {
        RequestTag::LatestFeed | RequestTag::LatestFeedAndRound => 8,
        RequestTag::FeedAtRound => 10,
        _ => 0,
    };
    if buf.remaining() > tail_len {
        return Err(StoreError::Protocol(format!(
            "Read request 0x{:02x}: {} trailing bytes (max {})",
            tag as u8,
            buf.remaining(),
            tail_len
        )));
    }

    // Omitted trailing fields read as zero
    let mut tail = [0u8; 10];
    let present = buf.remaining();
    buf.copy_to_slice(&mut tail[..present]);
    let mut tail = &tail[..tail_len];

    let query = match tag {
        RequestTag::LatestRound => ReadQuery::LatestRound { stride, id },
        RequestTag::LatestSingleFeed | RequestTag::LatestSingleFeedAndRound => {
            if stride != 0 {
                return Err(StoreError::range(format!(
                    "single feed reads use stride 0, got {}",
                    stride
                )));
            }
            if tag == RequestTag::LatestSingleFeed {
                ReadQuery::LatestSingleFeed { id }
            } else {
                ReadQuery::LatestSingleFeedAndRound { id }
            }
        }
        RequestTag::LatestFeed => ReadQuery::LatestFeed {
            stride,
            id,
            range: SlotRange::new(tail.get_u32(), tail.get_u32()),
        },
        RequestTag::LatestFeedAndRound => ReadQuery::LatestFeedAndRound {
            stride,
            id,
            range: SlotRange::new(tail.get_u32(), tail.get_u32()),
        },
        RequestTag::FeedAtRound => {
            let round = tail.get_u16();
            ReadQuery::FeedAtRound {
                stride,
                id,
                round,
                range: SlotRange::new(tail.get_u32(), tail.get_u32()),
            }
        }
        RequestTag::Admin | RequestTag::Write => {
            return Err(StoreError::Protocol(format!(
                "Tag 0x{:02x} is not a read",
                tag as u8
            )))
        }
    };

    Ok(query)
}

/// Encode a privileged proxy command
pub fn encode_admin(command: &AdminCommand) -> Vec<u8> {
    let address = match command {
        AdminCommand::UpgradeTo(address) | AdminCommand::ChangeAdmin(address) => address,
    };

    let mut buf = BytesMut::with_capacity(22);
    buf.put_u8(RequestTag::Admin as u8);
    buf.put_u8(command.op_byte());
    buf.put_slice(address.as_slice());
    buf.to_vec()
}

/// Decode a privileged proxy command body (tag already stripped)
pub fn decode_admin(body: &[u8]) -> Result<AdminCommand> {
    if body.len() != 21 {
        return Err(StoreError::Protocol(format!(
            "Admin request: expected 21 bytes, got {}",
            body.len()
        )));
    }

    let address = Address::from_slice(&body[1..]);
    match body[0] {
        AdminCommand::UPGRADE_TO => Ok(AdminCommand::UpgradeTo(address)),
        AdminCommand::CHANGE_ADMIN => Ok(AdminCommand::ChangeAdmin(address)),
        op => Err(StoreError::Protocol(format!(
            "Unknown admin operation: 0x{:02x}",
            op
        ))),
    }
}

/// Encode a round as a 32-byte big-endian word
pub fn encode_round(round: u16) -> Slot {
    let mut word = [0u8; SLOT_SIZE];
    word[SLOT_SIZE - 2..].copy_from_slice(&round.to_be_bytes());
    word
}

/// Decode a 32-byte round word
pub fn decode_round(bytes: &[u8]) -> Result<u16> {
    if bytes.len() < SLOT_SIZE {
        return Err(StoreError::Protocol(format!(
            "Round word: expected {} bytes, got {}",
            SLOT_SIZE,
            bytes.len()
        )));
    }
    let value = be_to_u64(&bytes[..SLOT_SIZE]);
    u16::try_from(value)
        .ok()
        .filter(|&r| bytes[..SLOT_SIZE - 8].iter().all(|&b| b == 0) && r < layout::ROUND_LIMIT)
        .ok_or_else(|| StoreError::Protocol("Round word out of range".to_string()))
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut message = Vec::with_capacity(HEADER_SIZE + response.payload.len());
    message.push(response.status as u8);
    message.extend_from_slice(&(response.payload.len() as u32).to_be_bytes());
    message.extend_from_slice(&response.payload);
    message
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    if bytes.len() < HEADER_SIZE {
        return Err(StoreError::Protocol(format!(
            "Incomplete response header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let status_byte = bytes[0];
    let payload_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;
    check_payload_len(payload_len)?;

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(StoreError::Protocol(format!(
            "Incomplete response payload: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    let status = Status::from_byte(status_byte).ok_or_else(|| {
        StoreError::Protocol(format!("Unknown response status: 0x{:02x}", status_byte))
    })?;

    Ok(Response {
        status,
        payload: bytes[HEADER_SIZE..total_len].to_vec(),
    })
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete request frame from a stream
///
/// Blocks until a full frame is received or an error occurs. Returns the
/// caller identity and the undecoded request payload. The identity is
/// whatever the peer sent; see the trust boundary in [`crate::config`].
pub fn read_request<R: Read>(reader: &mut R) -> Result<(Address, Vec<u8>)> {
    let mut header = [0u8; REQUEST_HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    check_payload_len(payload_len)?;

    let caller = Address::from_slice(&header[4..]);

    let mut payload = vec![0u8; payload_len];
    if payload_len > 0 {
        reader.read_exact(&mut payload)?;
    }

    Ok((caller, payload))
}

/// Write a request frame to a stream
pub fn write_request<W: Write>(writer: &mut W, caller: &Address, payload: &[u8]) -> Result<()> {
    check_payload_len(payload.len())?;

    let mut frame = Vec::with_capacity(REQUEST_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(caller.as_slice());
    frame.extend_from_slice(payload);

    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
    check_payload_len(payload_len)?;

    let mut payload = vec![0u8; payload_len];
    if payload_len > 0 {
        reader.read_exact(&mut payload)?;
    }

    let mut full_message = Vec::with_capacity(HEADER_SIZE + payload_len);
    full_message.extend_from_slice(&header);
    full_message.extend_from_slice(&payload);

    decode_response(&full_message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn check_payload_len(len: usize) -> Result<()> {
    if len > MAX_PAYLOAD_SIZE as usize {
        return Err(StoreError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(())
}

/// Split `n` bytes off the front of `buf`
fn take<'a>(buf: &mut &'a [u8], n: usize, what: &str) -> Result<&'a [u8]> {
    if buf.len() < n {
        return Err(StoreError::Protocol(format!(
            "Write request: incomplete {} (expected {} bytes, got {})",
            what,
            n,
            buf.len()
        )));
    }
    let (head, rest) = buf.split_at(n);
    *buf = rest;
    Ok(head)
}

/// Write a one-byte length followed by `bytes` without leading zeros
fn put_minimal(buf: &mut BytesMut, bytes: &[u8]) {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    buf.put_u8((bytes.len() - start) as u8);
    buf.put_slice(&bytes[start..]);
}

/// Big-endian bytes to u128, `None` if the value does not fit
fn be_to_u128(bytes: &[u8]) -> Option<u128> {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let significant = &bytes[start..];
    if significant.len() > 16 {
        return None;
    }
    Some(significant.iter().fold(0u128, |acc, &b| (acc << 8) | u128::from(b)))
}

/// Big-endian bytes to u64, keeping only the low 8 bytes
fn be_to_u64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}
