//! Transport
//!
//! Owns the stream to the device and moves bytes over it. Knows nothing
//! about the protocol.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{EciError, Result};

/// Byte transport over one stream
///
/// `send_all` and `recv_all` either move the full requested count or stop
/// at the first failed operation and report how far they got. Nothing is
/// retried.
pub struct Transport<S = TcpStream> {
    /// Open stream, `None` while disconnected
    stream: Option<S>,

    /// Peer address for logging
    peer_addr: String,
}

impl<S> Transport<S> {
    /// Create a disconnected transport
    pub fn new() -> Self {
        Self {
            stream: None,
            peer_addr: "unknown".to_string(),
        }
    }

    /// Wrap an already-connected stream
    pub fn from_stream(stream: S, peer_addr: impl Into<String>) -> Self {
        Self {
            stream: Some(stream),
            peer_addr: peer_addr.into(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    pub fn get_ref(&self) -> Option<&S> {
        self.stream.as_ref()
    }

    /// Release the stream. Safe to call when already disconnected.
    pub fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("Released connection to {}", self.peer_addr);
        }
    }
}

impl<S> Default for Transport<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Read + Write> Transport<S> {
    /// Send all of `data`, returning the number of bytes actually sent
    ///
    /// Stops at the first write that reports zero bytes or an error.
    pub fn send_all(&mut self, data: &[u8]) -> usize {
        let Some(stream) = self.stream.as_mut() else {
            return 0;
        };

        let mut sent = 0;
        while sent < data.len() {
            match stream.write(&data[sent..]) {
                Ok(0) => {
                    tracing::debug!("Peer {} stopped accepting data", self.peer_addr);
                    break;
                }
                Ok(n) => sent += n,
                Err(e) => {
                    tracing::debug!("Write to {} failed: {}", self.peer_addr, e);
                    break;
                }
            }
        }

        if sent == data.len() {
            // Flushing is a no-op for sockets but matters for buffered wrappers
            if let Err(e) = stream.flush() {
                tracing::debug!("Flush to {} failed: {}", self.peer_addr, e);
            }
        }

        tracing::trace!("Sent {}/{} bytes to {}", sent, data.len(), self.peer_addr);
        sent
    }

    /// Fill `buf` completely, returning the number of bytes actually received
    ///
    /// Stops at the first read that reports zero bytes (peer closed) or an error.
    pub fn recv_all(&mut self, buf: &mut [u8]) -> usize {
        let Some(stream) = self.stream.as_mut() else {
            return 0;
        };

        let mut received = 0;
        while received < buf.len() {
            match stream.read(&mut buf[received..]) {
                Ok(0) => {
                    tracing::debug!("Peer {} closed the connection", self.peer_addr);
                    break;
                }
                Ok(n) => received += n,
                Err(e) => {
                    tracing::debug!("Read from {} failed: {}", self.peer_addr, e);
                    break;
                }
            }
        }

        tracing::trace!("Received {}/{} bytes from {}", received, buf.len(), self.peer_addr);
        received
    }
}

impl Transport<TcpStream> {
    /// Open a TCP connection to the device
    ///
    /// Any existing connection is released first. On failure the transport
    /// is left disconnected.
    pub fn connect(&mut self, address: &str, port: u16) -> bool {
        let config = ClientConfig::builder().address(address).port(port).build();
        match self.connect_with(&config) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("{}", e);
                false
            }
        }
    }

    /// Open a TCP connection using the full client configuration
    pub fn connect_with(&mut self, config: &ClientConfig) -> Result<()> {
        self.disconnect();
        config.validate()?;

        let endpoint = config.endpoint();
        let stream = TcpStream::connect((config.address.as_str(), config.port)).map_err(|source| {
            EciError::Connect {
                addr: endpoint.clone(),
                source,
            }
        })?;

        // Latency matters more than throughput for triggers; failure here is not fatal
        if config.nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                tracing::warn!("Failed to disable Nagle's algorithm for {}: {}", endpoint, e);
            }
        }

        if config.read_timeout_ms > 0 {
            stream.set_read_timeout(Some(Duration::from_millis(config.read_timeout_ms)))?;
        }
        if config.write_timeout_ms > 0 {
            stream.set_write_timeout(Some(Duration::from_millis(config.write_timeout_ms)))?;
        }

        tracing::debug!("Connected to {}", endpoint);
        self.stream = Some(stream);
        self.peer_addr = endpoint;
        Ok(())
    }
}

impl<S> Drop for Transport<S> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
