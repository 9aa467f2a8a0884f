//! Fixed-length ticket records and their persistence.
//!
//! The downstream consumer reads two records per application:
//!
//! - the ownership record, exactly [`OWNERSHIP_RECORD_LEN`] bytes holding the
//!   raw ownership ticket followed by zero padding;
//! - the encrypted record, exactly [`ENCRYPTED_RECORD_LEN`] bytes laid out as
//!   `u32 LE account id`, `u32 LE payload length`, payload, zero padding.

mod encoder;
mod error;
mod types;
mod writer;

pub use encoder::{
    encrypted_record, ownership_record, ENCRYPTED_HEADER_LEN, ENCRYPTED_RECORD_LEN,
    OWNERSHIP_RECORD_LEN,
};
pub use error::TicketError;
pub use types::{AppTicket, EncryptedTicket, RecordKind};
pub use writer::TicketWriter;
