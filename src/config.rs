//! Configuration for the ECI client
//!
//! Centralized configuration with sensible defaults.

use crate::error::{EciError, Result};
use crate::protocol::ByteOrderSpec;

/// Default ECI port of the recording device
pub const DEFAULT_PORT: u16 = 55513;

/// Connection settings for one session
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -------------------------------------------------------------------------
    // Device Address
    // -------------------------------------------------------------------------
    /// Host name or IP address of the recording device
    pub address: String,

    /// TCP port of the recording device
    pub port: u16,

    // -------------------------------------------------------------------------
    // Session Configuration
    // -------------------------------------------------------------------------
    /// Byte order declared in the BeginSession handshake
    pub byte_order: ByteOrderSpec,

    // -------------------------------------------------------------------------
    // Socket Configuration
    // -------------------------------------------------------------------------
    /// Disable Nagle's algorithm so triggers leave immediately
    pub nodelay: bool,

    /// Socket read timeout (milliseconds, 0 = block forever)
    pub read_timeout_ms: u64,

    /// Socket write timeout (milliseconds, 0 = block forever)
    pub write_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            byte_order: ByteOrderSpec::native(),
            nodelay: true,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// `host:port` form used for logging
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Check the settings before any socket is opened
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(EciError::Config("device address is empty".to_string()));
        }
        if self.port == 0 {
            return Err(EciError::Config("device port must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the device address
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    /// Set the device port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the byte order declared at session start
    pub fn byte_order(mut self, spec: ByteOrderSpec) -> Self {
        self.config.byte_order = spec;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.config.nodelay = nodelay;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
