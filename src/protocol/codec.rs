//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! There is no framing: the tag byte alone determines how many bytes follow.
//! Multi-byte integers are written in host byte order with no padding
//! between fields.
//!
//! ### Commands
//! ```text
//! Q  ┌─────┬──────────────┐
//!    │ 'Q' │ ByteOrder (4)│
//!    └─────┴──────────────┘
//! T  ┌─────┬──────────────┐
//!    │ 'T' │ Time ms (4)  │
//!    └─────┴──────────────┘
//! D  ┌─────┬──────────┬──────────┬──────────┬──────────┬─────────────┐
//!    │ 'D' │ Size (2) │ Start (4)│ Dur (4)  │ Code (4) │ Zeros (13)  │
//!    └─────┴──────────┴──────────┴──────────┴──────────┴─────────────┘
//! X, B, E, A: tag only
//! ```
//!
//! ### Responses
//! ```text
//! 'Z'                     success
//! 'I' + version (1)       query success
//! 'F' + error code (2)    failure
//! ```

use std::io::{Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{ByteOrderSpec, Command, CommandType, EventCode, Response, ResponseType};
use crate::error::{EciError, Result};

/// Tag byte present at the start of every command and response
pub const TAG_SIZE: usize = 1;

/// Value of the Trigger size field: bytes following the field itself
pub const TRIGGER_PAYLOAD_SIZE: u16 = 25;

/// Zero bytes reserved for the unused Label/Description/Key fields
pub const TRIGGER_PADDING: usize = 13;

/// Largest encoded command (a Trigger)
pub const MAX_COMMAND_SIZE: usize = TAG_SIZE + 2 + TRIGGER_PAYLOAD_SIZE as usize;

/// Trigger fields that carry data: start, duration, code
const TRIGGER_FIELDS_SIZE: usize = 4 + 4 + 4;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to the exact bytes written on the wire
pub fn encode_command(command: &Command) -> Bytes {
    let mut buf = BytesMut::with_capacity(MAX_COMMAND_SIZE);
    buf.put_u8(command.command_type() as u8);

    match command {
        Command::Query(spec) => buf.put_slice(spec.as_bytes()),
        Command::Exit
        | Command::BeginRecording
        | Command::EndRecording
        | Command::Attention => {}
        Command::TimeSynch { timestamp_ms } => buf.put_i32_ne(*timestamp_ms),
        Command::Trigger {
            code,
            timestamp_ms,
            duration_ms,
        } => {
            buf.put_u16_ne(TRIGGER_PAYLOAD_SIZE);
            buf.put_i32_ne(*timestamp_ms);
            buf.put_i32_ne(*duration_ms);
            buf.put_slice(code.as_bytes());
            buf.put_bytes(0, TRIGGER_PADDING);
        }
    }

    buf.freeze()
}

/// Decode a complete command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (&tag, mut payload) = bytes
        .split_first()
        .ok_or_else(|| EciError::Protocol("Empty command".to_string()))?;

    let cmd_type = CommandType::from_u8(tag).ok_or_else(|| {
        EciError::Protocol(format!("Unknown command type: 0x{:02x}", tag))
    })?;

    let command = match cmd_type {
        CommandType::Query => {
            expect_len(cmd_type, payload, 4)?;
            let spec = ByteOrderSpec::try_from(payload)?;
            Command::Query(spec)
        }
        CommandType::Exit => bare(cmd_type, payload, Command::Exit)?,
        CommandType::BeginRecording => bare(cmd_type, payload, Command::BeginRecording)?,
        CommandType::EndRecording => bare(cmd_type, payload, Command::EndRecording)?,
        CommandType::Attention => bare(cmd_type, payload, Command::Attention)?,
        CommandType::TimeSynch => {
            expect_len(cmd_type, payload, 4)?;
            Command::TimeSynch {
                timestamp_ms: payload.get_i32_ne(),
            }
        }
        CommandType::EventDataStream => {
            if payload.len() < 2 {
                return Err(EciError::Protocol(
                    "Trigger command: missing size field".to_string(),
                ));
            }
            let size = payload.get_u16_ne() as usize;
            if size < TRIGGER_FIELDS_SIZE {
                return Err(EciError::Protocol(format!(
                    "Trigger command: size field {} too small",
                    size
                )));
            }
            expect_len(cmd_type, payload, size)?;

            let timestamp_ms = payload.get_i32_ne();
            let duration_ms = payload.get_i32_ne();
            let mut code = [0u8; 4];
            payload.copy_to_slice(&mut code);

            Command::Trigger {
                code: EventCode::new(code),
                timestamp_ms,
                duration_ms,
            }
        }
    };

    Ok(command)
}

fn expect_len(cmd_type: CommandType, payload: &[u8], expected: usize) -> Result<()> {
    if payload.len() != expected {
        return Err(EciError::Protocol(format!(
            "{:?} command: expected {} payload bytes, got {}",
            cmd_type,
            expected,
            payload.len()
        )));
    }
    Ok(())
}

fn bare(cmd_type: CommandType, payload: &[u8], command: Command) -> Result<Command> {
    expect_len(cmd_type, payload, 0)?;
    Ok(command)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Number of bytes that follow a response tag
pub fn response_payload_len(response_type: ResponseType) -> usize {
    match response_type {
        ResponseType::Success => 0,
        ResponseType::QuerySuccess => 1,
        ResponseType::Failure => 2,
    }
}

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> Bytes {
    let mut buf = BytesMut::with_capacity(TAG_SIZE + 2);
    buf.put_u8(response.response_type() as u8);

    match response {
        Response::Success => {}
        Response::QuerySuccess { version } => buf.put_u8(*version),
        Response::Failure { code } => buf.put_i16_ne(*code),
    }

    buf.freeze()
}

/// Decode a response from its tag and the payload that followed it
///
/// `payload` must hold exactly `response_payload_len` bytes for the tag.
pub fn decode_response(tag: u8, mut payload: &[u8]) -> Result<Response> {
    let response_type = ResponseType::from_u8(tag).ok_or(EciError::UnexpectedResponse(tag))?;

    let expected = response_payload_len(response_type);
    if payload.len() != expected {
        return Err(EciError::Protocol(format!(
            "{:?} response: expected {} payload bytes, got {}",
            response_type,
            expected,
            payload.len()
        )));
    }

    let response = match response_type {
        ResponseType::Success => Response::Success,
        ResponseType::QuerySuccess => Response::QuerySuccess {
            version: payload.get_u8(),
        },
        ResponseType::Failure => Response::Failure {
            code: payload.get_i16_ne(),
        },
    };

    Ok(response)
}

// =============================================================================
// Stream-based I/O helpers (device side)
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let mut tag = [0u8; TAG_SIZE];
    reader.read_exact(&mut tag)?;

    let cmd_type = CommandType::from_u8(tag[0]).ok_or_else(|| {
        EciError::Protocol(format!("Unknown command type: 0x{:02x}", tag[0]))
    })?;

    let mut message = Vec::with_capacity(MAX_COMMAND_SIZE);
    message.push(tag[0]);

    match cmd_type {
        CommandType::Query | CommandType::TimeSynch => {
            let mut payload = [0u8; 4];
            reader.read_exact(&mut payload)?;
            message.extend_from_slice(&payload);
        }
        CommandType::EventDataStream => {
            let mut size = [0u8; 2];
            reader.read_exact(&mut size)?;
            message.extend_from_slice(&size);

            let mut payload = vec![0u8; u16::from_ne_bytes(size) as usize];
            reader.read_exact(&mut payload)?;
            message.extend_from_slice(&payload);
        }
        CommandType::Exit
        | CommandType::BeginRecording
        | CommandType::EndRecording
        | CommandType::Attention => {}
    }

    decode_command(&message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
