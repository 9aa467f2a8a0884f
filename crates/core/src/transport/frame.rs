//! Frame codec for stream transports.
//!
//! Frame: `u32 LE length` + `"VT01"` + packet bytes. The length covers the
//! packet only.

use crate::protocol::{Packet, ProtocolError};

/// Magic that follows the length prefix of every frame.
pub const FRAME_MAGIC: [u8; 4] = *b"VT01";

/// Largest packet accepted from the wire.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Encode a packet into a complete frame.
pub fn encode_frame(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    let payload = packet.encode();
    if payload.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len: payload.len(),
            max: MAX_FRAME_LEN,
        });
    }

    let mut frame = Vec::with_capacity(8 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&FRAME_MAGIC);
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Validate a frame header, returning the packet length that follows it.
pub fn decode_frame_header(header: [u8; 8]) -> Result<usize, ProtocolError> {
    let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let magic = [header[4], header[5], header[6], header[7]];

    if magic != FRAME_MAGIC {
        return Err(ProtocolError::BadMagic(magic));
    }
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }
    Ok(len)
}

/// Decode a complete frame held in memory.
pub fn decode_frame(frame: &[u8]) -> Result<Packet, ProtocolError> {
    if frame.len() < 8 {
        return Err(ProtocolError::Truncated {
            needed: 8,
            actual: frame.len(),
        });
    }

    let mut header = [0u8; 8];
    header.copy_from_slice(&frame[..8]);
    let len = decode_frame_header(header)?;

    let payload = &frame[8..];
    if payload.len() < len {
        return Err(ProtocolError::Truncated {
            needed: 8 + len,
            actual: frame.len(),
        });
    }

    Packet::decode(&payload[..len])
}
