//! Duplex byte-channel boundary
//!
//! The protocol engine is agnostic to what carries the bytes — a
//! physical serial port, a virtual COM port, or a test double — as
//! long as the channel delivers them in order without reordering or
//! duplication.

mod serial;

pub use serial::{list_ports, PortInfo, SerialConfig, SerialParity, SerialTransport};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Transport error types
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Not connected
    #[error("Not connected")]
    NotConnected,

    /// Disconnected
    #[error("Disconnected")]
    Disconnected,
}

/// A duplex, ordered byte channel.
#[async_trait]
pub trait ByteChannel: Send + Sync {
    /// Open the channel
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Close the channel
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Write bytes and drain the output buffer before returning
    async fn send(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Poll for inbound bytes. Must return promptly: an empty chunk
    /// when nothing is available, never an indefinite block.
    async fn receive(&mut self) -> Result<Bytes, TransportError>;

    /// Get connection info string
    fn connection_info(&self) -> String;
}
