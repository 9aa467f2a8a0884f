//! Types for session management.

use thiserror::Error;

use crate::protocol::ProtocolError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session closed")]
    Closed,

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Result of one pump iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStatus {
    /// Nothing arrived within the poll wait.
    Idle,
    /// This many packets were dispatched.
    Dispatched(usize),
    /// The transport is gone; the session has been closed.
    Closed,
}
