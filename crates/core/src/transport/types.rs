//! Types for transport operations.

use async_trait::async_trait;
use thiserror::Error;

use crate::protocol::{Packet, ProtocolError};

/// Errors that can occur on the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connect timed out after {0} seconds")]
    ConnectTimeout(u64),

    #[error("Not connected")]
    NotConnected,

    #[error("Connection closed")]
    Closed,

    #[error("Malformed frame: {0}")]
    Malformed(#[from] ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for a packet transport.
///
/// Implementations handle framing and any encryption. Every method takes
/// `&self` so a transport can be shared between the pump loop (receiving) and
/// the flow (sending).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Name of this transport for logging.
    fn name(&self) -> &str;

    /// Establish the connection.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Send one packet.
    async fn send(&self, packet: Packet) -> Result<(), TransportError>;

    /// Receive the next inbound packet.
    ///
    /// Returns `None` once the connection is closed. Must be cancel-safe: the
    /// pump wraps this call in a timeout.
    async fn recv(&self) -> Option<Packet>;

    /// Close the connection. Idempotent.
    async fn close(&self);
}
