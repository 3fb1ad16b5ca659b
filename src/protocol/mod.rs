//! Protocol Module
//!
//! Defines the ECI wire protocol spoken with the recording device.
//!
//! ## Exchange
//! Strictly half-duplex: one command, then exactly one response, which must
//! be fully read before the next command is sent.
//!
//! ### Commands
//! - `Q`: Query / begin session  - Payload: byte order spec (4)
//! - `X`: Exit / end session     - Payload: empty
//! - `B`: Begin recording        - Payload: empty
//! - `E`: End recording          - Payload: empty
//! - `A`: Attention              - Payload: empty
//! - `T`: Time synch             - Payload: timestamp ms (4)
//! - `D`: Event data (trigger)   - Payload: size (2) + start (4) + duration (4) + code (4) + zeros (13)
//!
//! ### Responses
//! - `Z`: Success
//! - `I`: Query success          - Payload: protocol version (1)
//! - `F`: Failure                - Payload: error code (2)

mod command;
mod response;
mod codec;

pub use command::{ByteOrderSpec, Command, CommandType, EventCode};
pub use response::{Response, ResponseType};
pub use codec::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    response_payload_len, write_response, MAX_COMMAND_SIZE, TAG_SIZE, TRIGGER_PADDING,
    TRIGGER_PAYLOAD_SIZE,
};
