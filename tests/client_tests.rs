//! Tests for EciClient
//!
//! These tests verify:
//! - Connect handshake and rollback on failure
//! - Recording state transitions
//! - Failure responses, truncated responses and unknown tags
//! - Disconnect always releasing the connection
//! - Partial sends never waiting for a response

use std::io::{self, Cursor, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

use netstation::{ByteOrderSpec, ClientConfig, EciClient, EciError, SessionState, DEFAULT_PORT};

// =============================================================================
// Helper Functions
// =============================================================================

/// A peer that reads `expect` bytes, then writes `reply`, for each step,
/// and closes the connection after the last step.
///
/// The join handle yields every byte the peer read.
fn scripted_peer(steps: Vec<(usize, &'static [u8])>) -> (u16, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut received = Vec::new();

        for (expect, reply) in steps {
            let mut buf = vec![0u8; expect];
            if stream.read_exact(&mut buf).is_err() {
                break;
            }
            received.extend_from_slice(&buf);
            if stream.write_all(reply).is_err() {
                break;
            }
        }

        received
    });

    (port, handle)
}

fn connected_client(port: u16) -> EciClient {
    let mut client: EciClient = EciClient::new();
    assert!(client.connect(ByteOrderSpec::LITTLE_ENDIAN, "127.0.0.1", port));
    client
}

fn failure(code: [u8; 2]) -> i16 {
    i16::from_ne_bytes(code)
}

/// In-memory stream with scripted input and a cap on accepted bytes
struct CappedStream {
    input: Cursor<Vec<u8>>,
    written: Vec<u8>,
    write_limit: usize,
}

impl Read for CappedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for CappedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.write_limit - self.written.len());
        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// =============================================================================
// Connect Tests
// =============================================================================

#[test]
fn test_connect_with_success_response() {
    let (port, peer) = scripted_peer(vec![(5, b"Z")]);

    let client = connected_client(port);
    assert_eq!(client.state(), SessionState::Connected);
    assert_eq!(client.byte_order(), ByteOrderSpec::LITTLE_ENDIAN);
    assert_eq!(client.protocol_version(), None);
    assert!(client.last_error().is_none());

    assert_eq!(peer.join().unwrap(), b"QNTEL");
}

#[test]
fn test_connect_with_query_success_records_version() {
    let (port, peer) = scripted_peer(vec![(5, b"I\x05")]);

    let mut client: EciClient = EciClient::new();
    assert!(client.connect(ByteOrderSpec::BIG_ENDIAN, "127.0.0.1", port));
    assert_eq!(client.protocol_version(), Some(5));
    assert_eq!(client.byte_order(), ByteOrderSpec::BIG_ENDIAN);

    assert_eq!(peer.join().unwrap(), b"QUNIX");
}

#[test]
fn test_connect_truncated_query_response() {
    // Peer closes after the tag byte, before the version byte
    let (port, peer) = scripted_peer(vec![(5, b"I")]);

    let mut client: EciClient = EciClient::new();
    assert!(!client.connect(ByteOrderSpec::LITTLE_ENDIAN, "127.0.0.1", port));
    assert_eq!(client.state(), SessionState::Disconnected);
    assert!(!client.transport().is_connected());
    assert!(matches!(
        client.last_error(),
        Some(EciError::PartialIo {
            expected: 1,
            actual: 0,
            ..
        })
    ));

    peer.join().unwrap();
}

#[test]
fn test_connect_rejected_by_device() {
    let (port, peer) = scripted_peer(vec![(5, b"F\x00\x09")]);

    let mut client: EciClient = EciClient::new();
    assert!(!client.connect(ByteOrderSpec::from_bytes(*b"????"), "127.0.0.1", port));
    assert_eq!(client.state(), SessionState::Disconnected);
    assert!(!client.transport().is_connected());
    assert_eq!(
        client.last_error().and_then(EciError::device_code),
        Some(failure([0x00, 0x09]))
    );

    peer.join().unwrap();
}

#[test]
fn test_connect_refused() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut client: EciClient = EciClient::new();
    assert!(!client.connect(ByteOrderSpec::LITTLE_ENDIAN, "127.0.0.1", port));
    assert_eq!(client.state(), SessionState::Disconnected);
    assert!(matches!(client.last_error(), Some(EciError::Connect { .. })));
}

#[test]
fn test_unexpected_response_tag() {
    let (port, peer) = scripted_peer(vec![(5, b"Q")]);

    let mut client: EciClient = EciClient::new();
    assert!(!client.connect(ByteOrderSpec::LITTLE_ENDIAN, "127.0.0.1", port));
    assert!(matches!(
        client.last_error(),
        Some(EciError::UnexpectedResponse(b'Q'))
    ));
    assert!(client.last_error().unwrap().is_desync());

    peer.join().unwrap();
}

// =============================================================================
// Recording Tests
// =============================================================================

#[test]
fn test_begin_and_end_recording() {
    let (port, peer) = scripted_peer(vec![(5, b"Z"), (1, b"Z"), (1, b"Z"), (1, b"Z")]);

    let mut client = connected_client(port);
    assert!(client.begin_recording());
    assert_eq!(client.state(), SessionState::Recording);
    assert!(client.is_recording());

    assert!(client.end_recording());
    assert_eq!(client.state(), SessionState::Connected);

    assert!(client.disconnect());
    assert_eq!(client.state(), SessionState::Disconnected);

    assert_eq!(peer.join().unwrap(), b"QNTELBEX");
}

#[test]
fn test_begin_recording_rejected_keeps_state() {
    let (port, peer) = scripted_peer(vec![(5, b"Z"), (1, b"F\x00\x01")]);

    let mut client = connected_client(port);
    assert!(!client.begin_recording());
    assert_eq!(client.state(), SessionState::Connected);

    peer.join().unwrap();
}

#[test]
fn test_end_recording_while_connected() {
    let (port, peer) = scripted_peer(vec![(5, b"Z"), (1, b"F\x00\x02"), (1, b"Z")]);

    let mut client = connected_client(port);

    // Rejected: state untouched
    assert!(!client.end_recording());
    assert_eq!(client.state(), SessionState::Connected);

    // Accepted: still connected, not recording
    assert!(client.end_recording());
    assert_eq!(client.state(), SessionState::Connected);

    peer.join().unwrap();
}

#[test]
fn test_trigger_rejected_while_recording() {
    let (port, peer) = scripted_peer(vec![(5, b"Z"), (1, b"Z"), (28, b"F\x00\x01")]);

    let mut client = connected_client(port);
    assert!(client.begin_recording());

    assert!(!client.send_trigger(*b"STIM", 1000, 1));
    assert_eq!(client.state(), SessionState::Recording);
    assert!(client.transport().is_connected());

    let error = client.last_error().unwrap();
    assert_eq!(error.device_code(), Some(failure([0x00, 0x01])));
    assert!(!error.is_desync());

    let received = peer.join().unwrap();
    assert_eq!(received.len(), 5 + 1 + 28);
    assert_eq!(received[6], b'D');
    assert_eq!(&received[17..21], b"STIM");
}

#[test]
fn test_attention_and_synch() {
    let (port, peer) = scripted_peer(vec![(5, b"Z"), (1, b"Z"), (5, b"Z")]);

    let mut client = connected_client(port);
    assert!(client.send_attention());
    assert!(client.send_synch(4242));
    assert_eq!(client.state(), SessionState::Connected);

    let received = peer.join().unwrap();
    assert_eq!(received[5], b'A');
    assert_eq!(received[6], b'T');
    assert_eq!(&received[7..11], &4242i32.to_ne_bytes());
}

#[test]
fn test_query_on_open_session() {
    let (port, peer) = scripted_peer(vec![(5, b"Z"), (5, b"I\x02")]);

    let mut client = connected_client(port);
    assert!(client.query(ByteOrderSpec::MAC));
    assert_eq!(client.byte_order(), ByteOrderSpec::MAC);
    assert_eq!(client.protocol_version(), Some(2));
    assert_eq!(client.state(), SessionState::Connected);

    assert_eq!(peer.join().unwrap(), b"QNTELQMAC-");
}

// =============================================================================
// Disconnect Tests
// =============================================================================

#[test]
fn test_disconnect_releases_on_failure() {
    let (port, peer) = scripted_peer(vec![(5, b"Z"), (1, b"F\x00\x03")]);

    let mut client = connected_client(port);
    assert!(!client.disconnect());
    assert_eq!(client.state(), SessionState::Disconnected);
    assert!(!client.transport().is_connected());

    peer.join().unwrap();
}

#[test]
fn test_disconnect_releases_when_peer_gone() {
    let (port, peer) = scripted_peer(vec![(5, b"Z")]);

    let mut client = connected_client(port);
    peer.join().unwrap();

    assert!(!client.disconnect());
    assert!(!client.transport().is_connected());
    assert_eq!(client.state(), SessionState::Disconnected);
}

#[test]
fn test_commands_while_disconnected() {
    let mut client: EciClient = EciClient::new();

    assert!(!client.begin_recording());
    assert!(matches!(client.last_error(), Some(EciError::NotConnected)));
    assert!(!client.end_recording());
    assert!(!client.send_attention());
    assert!(!client.send_synch(1));
    assert!(!client.send_trigger(*b"STIM", 1, 1));
    assert!(!client.disconnect());
    assert_eq!(client.state(), SessionState::Disconnected);
}

// =============================================================================
// In-Memory Stream Tests
// =============================================================================

#[test]
fn test_open_over_stream() {
    let stream = CappedStream {
        input: Cursor::new(b"I\x03Z".to_vec()),
        written: Vec::new(),
        write_limit: usize::MAX,
    };

    let mut client = EciClient::new();
    assert!(client.open(stream, ByteOrderSpec::LITTLE_ENDIAN));
    assert_eq!(client.protocol_version(), Some(3));
    assert!(client.send_attention());

    let written = &client.transport().get_ref().unwrap().written;
    assert_eq!(written, b"QNTELA");
}

#[test]
fn test_partial_trigger_send_skips_response() {
    // Handshake (5) and BeginRecording (1) go through, then only 10 of the
    // trigger's 28 bytes are accepted
    let stream = CappedStream {
        input: Cursor::new(b"I\x01ZZ".to_vec()),
        written: Vec::new(),
        write_limit: 5 + 1 + 10,
    };

    let mut client = EciClient::new();
    assert!(client.open(stream, ByteOrderSpec::LITTLE_ENDIAN));
    assert!(client.begin_recording());

    assert!(!client.send_trigger(*b"STIM", 1000, 1));
    assert!(matches!(
        client.last_error(),
        Some(EciError::PartialIo {
            operation: "send",
            expected: 28,
            actual: 10,
        })
    ));
    assert_eq!(client.state(), SessionState::Recording);

    // The trailing Z was never read
    let stream = client.transport().get_ref().unwrap();
    assert_eq!(stream.input.position(), 3);
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
fn test_config_defaults_and_builder() {
    let config = ClientConfig::default();
    assert_eq!(config.address, "127.0.0.1");
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.byte_order, ByteOrderSpec::native());
    assert!(config.nodelay);
    assert_eq!(config.read_timeout_ms, 0);

    let config = ClientConfig::builder()
        .address("10.0.0.42")
        .port(1234)
        .byte_order(ByteOrderSpec::BIG_ENDIAN)
        .nodelay(false)
        .read_timeout_ms(500)
        .write_timeout_ms(250)
        .build();
    assert_eq!(config.endpoint(), "10.0.0.42:1234");
    assert_eq!(config.byte_order, ByteOrderSpec::BIG_ENDIAN);
    assert!(!config.nodelay);
    assert_eq!(config.read_timeout_ms, 500);
    assert_eq!(config.write_timeout_ms, 250);
}

#[test]
fn test_connect_rejects_invalid_config() {
    let mut client: EciClient = EciClient::new();

    let config = ClientConfig::builder().port(0).build();
    assert!(!client.connect_with(&config));
    assert!(matches!(client.last_error(), Some(EciError::Config(_))));
    assert_eq!(client.state(), SessionState::Disconnected);

    let config = ClientConfig::builder().address(" ").build();
    assert!(!client.connect_with(&config));
    assert!(matches!(client.last_error(), Some(EciError::Config(_))));
    assert!(!client.transport().is_connected());

    assert!(ClientConfig::default().validate().is_ok());
}

#[test]
fn test_connect_with_read_timeout_on_silent_peer() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    // Accept and read the handshake, but never answer
    let peer = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 5];
        stream.read_exact(&mut buf).unwrap();
        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest);
    });

    let config = ClientConfig::builder()
        .port(port)
        .read_timeout_ms(100)
        .build();

    let mut client: EciClient<TcpStream> = EciClient::new();
    assert!(!client.connect_with(&config));
    assert_eq!(client.state(), SessionState::Disconnected);

    peer.join().unwrap();
}
