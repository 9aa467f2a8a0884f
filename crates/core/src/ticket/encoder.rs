//! Record encoding.

use super::{RecordKind, TicketError};

/// Length of the ownership record.
pub const OWNERSHIP_RECORD_LEN: usize = 1024;

/// Length of the encrypted record.
pub const ENCRYPTED_RECORD_LEN: usize = 4104;

/// Account id plus payload length.
pub const ENCRYPTED_HEADER_LEN: usize = 8;

/// Zero-pad `payload` on the right to [`OWNERSHIP_RECORD_LEN`].
///
/// Fails instead of truncating when the payload is too long.
pub fn ownership_record(payload: &[u8]) -> Result<Vec<u8>, TicketError> {
    if payload.len() > OWNERSHIP_RECORD_LEN {
        return Err(TicketError::Overflow {
            kind: RecordKind::Ownership,
            len: payload.len(),
            max: OWNERSHIP_RECORD_LEN,
        });
    }
    let mut record = Vec::with_capacity(OWNERSHIP_RECORD_LEN);
    record.extend_from_slice(payload);
    record.resize(OWNERSHIP_RECORD_LEN, 0);
    Ok(record)
}

/// Build `u32 LE account_id ++ u32 LE len ++ payload`, zero-padded to
/// [`ENCRYPTED_RECORD_LEN`].
pub fn encrypted_record(account_id: u32, payload: &[u8]) -> Result<Vec<u8>, TicketError> {
    let max = ENCRYPTED_RECORD_LEN - ENCRYPTED_HEADER_LEN;
    let overflow = TicketError::Overflow {
        kind: RecordKind::Encrypted,
        len: payload.len(),
        max,
    };
    if payload.len() > max {
        return Err(overflow);
    }
    let len = u32::try_from(payload.len()).map_err(|_| overflow)?;

    let mut record = Vec::with_capacity(ENCRYPTED_RECORD_LEN);
    record.extend_from_slice(&account_id.to_le_bytes());
    record.extend_from_slice(&len.to_le_bytes());
    record.extend_from_slice(payload);
    record.resize(ENCRYPTED_RECORD_LEN, 0);
    Ok(record)
}
