//! Response definitions
//!
//! Represents responses to clients.

use crate::error::{Result, StoreError};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    Unauthorized = 0x01,
    OutOfOrder = 0x02,
    OutOfRange = 0x03,
    OverCapacity = 0x04,
    AdminAccess = 0x05,
    BadImplementation = 0x06,
    Malformed = 0x07,
    Error = 0x08,
}

impl Status {
    /// Parse a status byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Status::Ok),
            0x01 => Some(Status::Unauthorized),
            0x02 => Some(Status::OutOfOrder),
            0x03 => Some(Status::OutOfRange),
            0x04 => Some(Status::OverCapacity),
            0x05 => Some(Status::AdminAccess),
            0x06 => Some(Status::BadImplementation),
            0x07 => Some(Status::Malformed),
            0x08 => Some(Status::Error),
            _ => None,
        }
    }

    /// Wire status for an error
    pub fn for_error(err: &StoreError) -> Self {
        match err {
            StoreError::Authorization(_) => Status::Unauthorized,
            StoreError::Ordering { .. } => Status::OutOfOrder,
            StoreError::Range(_) => Status::OutOfRange,
            StoreError::Capacity { .. } => Status::OverCapacity,
            StoreError::AdminAccess(_) => Status::AdminAccess,
            StoreError::Implementation(_) => Status::BadImplementation,
            StoreError::Protocol(_) => Status::Malformed,
            _ => Status::Error,
        }
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Raw slot bytes on success, error message otherwise
    pub payload: Vec<u8>,
}

impl Response {
    /// Create an OK response
    pub fn ok(payload: Vec<u8>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Create an error response carrying the error message
    pub fn error(err: &StoreError) -> Self {
        Self {
            status: Status::for_error(err),
            payload: err.to_string().into_bytes(),
        }
    }

    /// Build the response for an execution result
    pub fn from_result(result: Result<Vec<u8>>) -> Self {
        match result {
            Ok(payload) => Self::ok(payload),
            Err(e) => Self::error(&e),
        }
    }

    /// Convert back into a result on the client side
    pub fn into_result(self) -> Result<Vec<u8>> {
        match self.status {
            Status::Ok => Ok(self.payload),
            status => Err(StoreError::Rejected {
                status,
                message: String::from_utf8_lossy(&self.payload).into_owned(),
            }),
        }
    }
}
