//! Network Module
//!
//! Byte transport to the device, plus an emulated device for testing.
//!
//! ## Architecture
//! - `Transport`: owns one stream, complete send/receive, no protocol knowledge
//! - `MockDevice`: TCP listener speaking the device side of the protocol

mod transport;
mod device;

pub use transport::Transport;
pub use device::{
    DeviceHandle, DeviceState, MockDevice, DEFAULT_VERSION, ERROR_ALREADY_RECORDING,
    ERROR_INVALID_EVENT, ERROR_NO_SESSION, ERROR_NOT_RECORDING,
};
