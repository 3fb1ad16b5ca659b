//! Response definitions
//!
//! Represents responses received from the device.

/// Response tag bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseType {
    QuerySuccess = b'I',
    Success = b'Z',
    Failure = b'F',
}

impl ResponseType {
    /// Decode a tag byte. Returns `None` for unknown tags.
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            b'I' => Some(ResponseType::QuerySuccess),
            b'Z' => Some(ResponseType::Success),
            b'F' => Some(ResponseType::Failure),
            _ => None,
        }
    }
}

/// A response to exactly one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Command accepted
    Success,

    /// Query accepted, carrying the device protocol version
    QuerySuccess { version: u8 },

    /// Command rejected with a vendor error code
    Failure { code: i16 },
}

impl Response {
    /// Get the response type
    pub fn response_type(&self) -> ResponseType {
        match self {
            Response::Success => ResponseType::Success,
            Response::QuerySuccess { .. } => ResponseType::QuerySuccess,
            Response::Failure { .. } => ResponseType::Failure,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Response::Failure { .. })
    }
}
