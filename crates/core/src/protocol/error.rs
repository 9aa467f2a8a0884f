use thiserror::Error;

use super::MessageKind;

/// Errors raised while encoding or decoding packets and message bodies.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Failed to encode {kind} body: {source}")]
    Encode {
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode {kind} body: {source}")]
    Decode {
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("Packet truncated: need at least {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("Invalid frame magic: {0:02x?}")]
    BadMagic([u8; 4]),

    #[error("Frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge { len: usize, max: usize },
}
