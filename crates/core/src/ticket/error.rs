use std::path::PathBuf;
use thiserror::Error;

use super::RecordKind;

#[derive(Debug, Error)]
pub enum TicketError {
    /// Payload does not fit in the fixed record.
    #[error("{kind} payload of {len} bytes exceeds the {max}-byte record")]
    Overflow {
        kind: RecordKind,
        len: usize,
        max: usize,
    },

    /// A record handed to the writer has the wrong size.
    #[error("{kind} record must be {expected} bytes, got {actual}")]
    WrongLength {
        kind: RecordKind,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to write ticket record to {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
