//! Command definitions
//!
//! Represents commands sent to the recording device.

use std::fmt;

use crate::error::EciError;

/// Command tag bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Query = b'Q',
    Exit = b'X',
    BeginRecording = b'B',
    EndRecording = b'E',
    Attention = b'A',
    TimeSynch = b'T',
    EventDataStream = b'D',
}

impl CommandType {
    /// Decode a tag byte. Returns `None` for unknown tags.
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            b'Q' => Some(CommandType::Query),
            b'X' => Some(CommandType::Exit),
            b'B' => Some(CommandType::BeginRecording),
            b'E' => Some(CommandType::EndRecording),
            b'A' => Some(CommandType::Attention),
            b'T' => Some(CommandType::TimeSynch),
            b'D' => Some(CommandType::EventDataStream),
            _ => None,
        }
    }
}

// =============================================================================
// ByteOrderSpec
// =============================================================================

/// 4-byte tag declaring the byte order the device should assume.
///
/// Any 4 bytes are accepted; the device validates the tag, not the client.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteOrderSpec([u8; 4]);

impl ByteOrderSpec {
    /// Data is little endian
    pub const LITTLE_ENDIAN: ByteOrderSpec = ByteOrderSpec(*b"NTEL");

    /// Data is big endian
    pub const BIG_ENDIAN: ByteOrderSpec = ByteOrderSpec(*b"UNIX");

    /// Legacy big endian tag, interchangeable with `BIG_ENDIAN`
    pub const MAC: ByteOrderSpec = ByteOrderSpec(*b"MAC-");

    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        ByteOrderSpec(bytes)
    }

    /// Tag matching the byte order of this host
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::BIG_ENDIAN
        } else {
            Self::LITTLE_ENDIAN
        }
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    pub fn is_little_endian(&self) -> bool {
        *self == Self::LITTLE_ENDIAN
    }

    pub fn is_big_endian(&self) -> bool {
        *self == Self::BIG_ENDIAN || *self == Self::MAC
    }
}

impl Default for ByteOrderSpec {
    fn default() -> Self {
        Self::native()
    }
}

impl TryFrom<&[u8]> for ByteOrderSpec {
    type Error = EciError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let tag: [u8; 4] = bytes
            .try_into()
            .map_err(|_| EciError::InvalidByteOrder(bytes.len()))?;
        Ok(ByteOrderSpec(tag))
    }
}

impl TryFrom<&str> for ByteOrderSpec {
    type Error = EciError;

    fn try_from(tag: &str) -> Result<Self, Self::Error> {
        ByteOrderSpec::try_from(tag.as_bytes())
    }
}

impl fmt::Debug for ByteOrderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteOrderSpec({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for ByteOrderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

// =============================================================================
// EventCode
// =============================================================================

/// Application-defined 4-byte event identifier carried by a Trigger
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventCode([u8; 4]);

impl EventCode {
    pub const fn new(code: [u8; 4]) -> Self {
        EventCode(code)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<[u8; 4]> for EventCode {
    fn from(code: [u8; 4]) -> Self {
        EventCode(code)
    }
}

impl TryFrom<&[u8]> for EventCode {
    type Error = EciError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let code: [u8; 4] = bytes
            .try_into()
            .map_err(|_| EciError::InvalidEventCode(bytes.len()))?;
        Ok(EventCode(code))
    }
}

impl TryFrom<&str> for EventCode {
    type Error = EciError;

    fn try_from(code: &str) -> Result<Self, Self::Error> {
        EventCode::try_from(code.as_bytes())
    }
}

impl fmt::Debug for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventCode({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

// =============================================================================
// Command
// =============================================================================

/// A command sent to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Begin a session, declaring the byte order of all later fields
    Query(ByteOrderSpec),

    /// End the session
    Exit,

    BeginRecording,

    EndRecording,

    /// Attention (prepares the device for an upcoming synch)
    Attention,

    /// Time synchronization point, in milliseconds
    TimeSynch { timestamp_ms: i32 },

    /// Timestamped event marker
    Trigger {
        code: EventCode,
        timestamp_ms: i32,
        duration_ms: i32,
    },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Query(_) => CommandType::Query,
            Command::Exit => CommandType::Exit,
            Command::BeginRecording => CommandType::BeginRecording,
            Command::EndRecording => CommandType::EndRecording,
            Command::Attention => CommandType::Attention,
            Command::TimeSynch { .. } => CommandType::TimeSynch,
            Command::Trigger { .. } => CommandType::EventDataStream,
        }
    }
}
