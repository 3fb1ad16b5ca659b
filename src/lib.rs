//! # netstation
//!
//! Client for the ECI event-marking protocol, used to drive a physiological
//! recording device over a persistent TCP connection:
//! - Byte order handshake at session start
//! - Begin/end recording, attention and time synch commands
//! - Timestamped event triggers during recording
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        EciClient                            │
//! │         (session state machine, bool call surface)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Command / Response
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Protocol Codec                          │
//! │            (tag byte + fixed binary fields)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ bytes
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Transport                             │
//! │            (complete send/recv over TcpStream)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use netstation::{ByteOrderSpec, EciClient};
//!
//! let mut client: EciClient = EciClient::new();
//! if client.connect(ByteOrderSpec::native(), "10.0.0.42", 55513) {
//!     client.begin_recording();
//!     client.send_trigger(*b"STIM", 1000, 1);
//!     client.end_recording();
//!     client.disconnect();
//! }
//! ```
//!
//! All calls block until the device answers. No timeouts apply unless set
//! through [`ClientConfig`].

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{EciError, Result};
pub use config::{ClientConfig, DEFAULT_PORT};
pub use client::{EciClient, SessionState};
pub use protocol::{ByteOrderSpec, Command, EventCode, Response};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
