//! Ticket types.

use std::fmt;

use crate::protocol::EncryptedAppTicket;

use super::{ENCRYPTED_RECORD_LEN, OWNERSHIP_RECORD_LEN};

/// Which of the two records a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Ownership,
    Encrypted,
}

impl RecordKind {
    /// Fixed length of a record of this kind.
    pub fn record_len(self) -> usize {
        match self {
            RecordKind::Ownership => OWNERSHIP_RECORD_LEN,
            RecordKind::Encrypted => ENCRYPTED_RECORD_LEN,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Ownership => "ownership",
            RecordKind::Encrypted => "encrypted",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw ownership ticket for one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppTicket {
    pub app_id: u32,
    pub payload: Vec<u8>,
}

/// Encrypted, session-bound ticket for one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedTicket {
    pub app_id: u32,
    pub version: u32,
    pub crc: u32,
    pub encrypted_user_data_len: u32,
    pub encrypted_ownership_len: u32,
    pub payload: Vec<u8>,
}

impl EncryptedTicket {
    pub fn from_message(app_id: u32, ticket: EncryptedAppTicket) -> Self {
        Self {
            app_id,
            version: ticket.ticket_version_no,
            crc: ticket.crc_encryptedticket,
            encrypted_user_data_len: ticket.cb_encrypteduserdata,
            encrypted_ownership_len: ticket.cb_encrypted_appownershipticket,
            payload: ticket.encrypted_ticket,
        }
    }
}
