//! Decode functions for every inbound message kind the client understands.

use crate::protocol::{decode_body, Inbound, MessageKind, ProtocolError};

/// Decodes a packet body of one kind into an `Inbound` message.
pub type DecodeFn = fn(&[u8]) -> Result<Inbound, ProtocolError>;

fn decode_service_response(body: &[u8]) -> Result<Inbound, ProtocolError> {
    decode_body(MessageKind::ServiceMethodResponse, body).map(Inbound::Service)
}

fn decode_logon_response(body: &[u8]) -> Result<Inbound, ProtocolError> {
    decode_body(MessageKind::ClientLogOnResponse, body).map(Inbound::LogOnResponse)
}

fn decode_logged_off(body: &[u8]) -> Result<Inbound, ProtocolError> {
    decode_body(MessageKind::ClientLoggedOff, body).map(Inbound::LoggedOff)
}

fn decode_account_info(body: &[u8]) -> Result<Inbound, ProtocolError> {
    decode_body(MessageKind::ClientAccountInfo, body).map(Inbound::AccountInfo)
}

fn decode_ownership_ticket(body: &[u8]) -> Result<Inbound, ProtocolError> {
    decode_body(MessageKind::ClientGetAppOwnershipTicketResponse, body)
        .map(Inbound::OwnershipTicket)
}

fn decode_encrypted_ticket(body: &[u8]) -> Result<Inbound, ProtocolError> {
    decode_body(MessageKind::ClientRequestEncryptedAppTicketResponse, body)
        .map(Inbound::EncryptedTicket)
}

/// The decoder set installed by `Dispatcher::with_default_decoders`.
pub fn default_decoders() -> Vec<(MessageKind, DecodeFn)> {
    let decoders: [(MessageKind, DecodeFn); 6] = [
        (MessageKind::ServiceMethodResponse, decode_service_response),
        (MessageKind::ClientLogOnResponse, decode_logon_response),
        (MessageKind::ClientLoggedOff, decode_logged_off),
        (MessageKind::ClientAccountInfo, decode_account_info),
        (
            MessageKind::ClientGetAppOwnershipTicketResponse,
            decode_ownership_ticket,
        ),
        (
            MessageKind::ClientRequestEncryptedAppTicketResponse,
            decode_encrypted_ticket,
        ),
    ];
    decoders.to_vec()
}
