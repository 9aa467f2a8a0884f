//! Types for job correlation.

use thiserror::Error;

use crate::protocol::{JobId, MessageKind, ProtocolError};
use crate::transport::TransportError;

/// Errors surfaced to a caller awaiting a correlated response.
#[derive(Debug, Error)]
pub enum JobError {
    /// No matching response arrived before the deadline.
    #[error("job {job_id} timed out waiting for {expected}")]
    Timeout {
        job_id: JobId,
        expected: MessageKind,
    },

    /// The session closed before the job resolved.
    #[error("session closed")]
    SessionClosed,

    /// The matching response could not be decoded.
    #[error("job {job_id} received a malformed {kind}: {reason}")]
    Malformed {
        job_id: JobId,
        kind: MessageKind,
        reason: String,
    },

    /// The response matched the job but was not the message the caller expected.
    #[error("job {job_id} expected {expected}, got a different {actual}")]
    UnexpectedResponse {
        job_id: JobId,
        expected: &'static str,
        actual: MessageKind,
    },

    #[error("failed to encode request: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("failed to send request: {0}")]
    Transport(#[from] TransportError),
}

impl JobError {
    /// Whether the failure came from the deadline rather than the remote.
    pub fn is_timeout(&self) -> bool {
        matches!(self, JobError::Timeout { .. })
    }
}
