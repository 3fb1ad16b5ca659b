//! ECI Client
//!
//! The session state machine. It owns the transport, is the only component
//! that issues commands, and tracks what the device last acknowledged.
//!
//! ## States
//! ```text
//!                connect                begin_recording
//! Disconnected ──────────▶ Connected ─────────────────▶ Recording
//!      ▲                    │    ▲                          │
//!      │     disconnect     │    │      end_recording       │
//!      └────────────────────┘    └──────────────────────────┘
//!      ▲                                                    │
//!      └────────────────────── disconnect ──────────────────┘
//! ```
//!
//! Every public operation returns `true` only when the whole command was
//! sent and a Success (or QuerySuccess) response was read back. Failures are
//! logged once where they are detected and kept in [`EciClient::last_error`].
//!
//! Methods take `&mut self`, so one outstanding command per session is
//! enforced by the borrow checker. Sharing a client across threads needs an
//! external lock.

use std::io::{Read, Write};
use std::net::TcpStream;

use crate::config::ClientConfig;
use crate::error::{EciError, Result};
use crate::network::Transport;
use crate::protocol::{
    decode_response, encode_command, response_payload_len, ByteOrderSpec, Command, EventCode,
    Response, ResponseType, TAG_SIZE,
};

/// Where the session stands, as last acknowledged by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Recording,
}

/// Client for one ECI session
pub struct EciClient<S = TcpStream> {
    transport: Transport<S>,

    /// Byte order declared in the last successful handshake
    byte_order: ByteOrderSpec,

    state: SessionState,

    /// Version reported by a QuerySuccess response
    protocol_version: Option<u8>,

    /// Error from the most recent call, if it failed
    last_error: Option<EciError>,
}

impl<S> EciClient<S> {
    /// Create a disconnected client
    pub fn new() -> Self {
        Self {
            transport: Transport::new(),
            byte_order: ByteOrderSpec::native(),
            state: SessionState::Disconnected,
            protocol_version: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state != SessionState::Disconnected
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    pub fn byte_order(&self) -> ByteOrderSpec {
        self.byte_order
    }

    /// Protocol version reported by the device, if it sent one
    pub fn protocol_version(&self) -> Option<u8> {
        self.protocol_version
    }

    /// Why the most recent call returned `false`
    ///
    /// For a rejected command this carries the vendor error code
    /// (see [`EciError::device_code`]).
    pub fn last_error(&self) -> Option<&EciError> {
        self.last_error.as_ref()
    }

    pub fn transport(&self) -> &Transport<S> {
        &self.transport
    }

    fn reset(&mut self) {
        self.transport.disconnect();
        self.state = SessionState::Disconnected;
        self.protocol_version = None;
    }

    /// Log and keep a failure, collapsing the outcome to a bool
    fn settle<T>(&mut self, operation: &str, result: Result<T>) -> bool {
        match result {
            Ok(_) => {
                self.last_error = None;
                true
            }
            Err(e) => {
                tracing::warn!("{} failed: {}", operation, e);
                self.last_error = Some(e);
                false
            }
        }
    }
}

impl<S> Default for EciClient<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl EciClient<TcpStream> {
    /// Connect to the device and begin a session
    ///
    /// Returns `true` only if both the TCP connection and the BeginSession
    /// handshake succeed. On failure the client is left disconnected.
    pub fn connect(&mut self, spec: ByteOrderSpec, address: &str, port: u16) -> bool {
        let config = ClientConfig::builder()
            .address(address)
            .port(port)
            .byte_order(spec)
            .build();
        self.connect_with(&config)
    }

    /// Connect using the full client configuration
    pub fn connect_with(&mut self, config: &ClientConfig) -> bool {
        if self.is_connected() {
            tracing::debug!("Dropping existing session with {}", self.transport.peer_addr());
        }
        self.reset();

        let result = self
            .transport
            .connect_with(config)
            .and_then(|()| self.begin_session(config.byte_order));

        if result.is_err() {
            self.reset();
        }
        self.settle("connect", result)
    }
}

impl<S: Read + Write> EciClient<S> {
    /// Begin a session over an already-connected stream
    pub fn open(&mut self, stream: S, spec: ByteOrderSpec) -> bool {
        self.reset();
        self.transport = Transport::from_stream(stream, "stream");

        let result = self.begin_session(spec);
        if result.is_err() {
            self.reset();
        }
        self.settle("open", result)
    }

    /// End the session and release the connection
    ///
    /// The connection is released even when the device does not acknowledge
    /// the EndSession command.
    pub fn disconnect(&mut self) -> bool {
        let result = self.round_trip(&Command::Exit);
        self.reset();
        tracing::debug!("Session ended");
        self.settle("disconnect", result)
    }

    /// Re-issue the BeginSession handshake on the open session
    pub fn query(&mut self, spec: ByteOrderSpec) -> bool {
        let result = self.begin_session(spec);
        self.settle("query", result)
    }

    pub fn begin_recording(&mut self) -> bool {
        let result = self.round_trip(&Command::BeginRecording);
        if result.is_ok() {
            self.state = SessionState::Recording;
        }
        self.settle("begin_recording", result)
    }

    pub fn end_recording(&mut self) -> bool {
        let result = self.round_trip(&Command::EndRecording);
        if result.is_ok() {
            self.state = SessionState::Connected;
        }
        self.settle("end_recording", result)
    }

    pub fn send_attention(&mut self) -> bool {
        let result = self.round_trip(&Command::Attention);
        self.settle("send_attention", result)
    }

    pub fn send_synch(&mut self, timestamp_ms: i32) -> bool {
        let result = self.round_trip(&Command::TimeSynch { timestamp_ms });
        self.settle("send_synch", result)
    }

    /// Send a timestamped event marker
    ///
    /// The device expects this while recording, with a duration of at least
    /// one millisecond and strictly increasing timestamps. None of that is
    /// checked here; the device decides.
    pub fn send_trigger(
        &mut self,
        code: impl Into<EventCode>,
        timestamp_ms: i32,
        duration_ms: i32,
    ) -> bool {
        if self.state == SessionState::Connected {
            tracing::debug!("Sending trigger while not recording");
        }

        let command = Command::Trigger {
            code: code.into(),
            timestamp_ms,
            duration_ms,
        };
        let result = self.round_trip(&command);
        self.settle("send_trigger", result)
    }

    fn begin_session(&mut self, spec: ByteOrderSpec) -> Result<()> {
        let response = self.round_trip(&Command::Query(spec))?;

        self.protocol_version = match response {
            Response::QuerySuccess { version } => Some(version),
            _ => None,
        };
        self.byte_order = spec;
        if self.state == SessionState::Disconnected {
            self.state = SessionState::Connected;
        }

        tracing::debug!(
            "Session started with {} (byte order {}, version {:?})",
            self.transport.peer_addr(),
            spec,
            self.protocol_version
        );
        Ok(())
    }

    /// Send one command and read its full response
    fn round_trip(&mut self, command: &Command) -> Result<Response> {
        if !self.transport.is_connected() {
            return Err(EciError::NotConnected);
        }

        let bytes = encode_command(command);
        let sent = self.transport.send_all(&bytes);
        if sent != bytes.len() {
            return Err(EciError::PartialIo {
                operation: "send",
                expected: bytes.len(),
                actual: sent,
            });
        }

        let mut tag = [0u8; TAG_SIZE];
        let received = self.transport.recv_all(&mut tag);
        if received != TAG_SIZE {
            return Err(EciError::PartialIo {
                operation: "receive response tag",
                expected: TAG_SIZE,
                actual: received,
            });
        }

        let response_type =
            ResponseType::from_u8(tag[0]).ok_or(EciError::UnexpectedResponse(tag[0]))?;

        let mut payload = [0u8; 2];
        let payload = &mut payload[..response_payload_len(response_type)];
        let received = self.transport.recv_all(payload);
        if received != payload.len() {
            return Err(EciError::PartialIo {
                operation: "receive response payload",
                expected: payload.len(),
                actual: received,
            });
        }

        match decode_response(tag[0], payload)? {
            Response::Failure { code } => Err(EciError::Device(code)),
            response => {
                tracing::trace!("{:?} -> {:?}", command.command_type(), response);
                Ok(response)
            }
        }
    }
}
