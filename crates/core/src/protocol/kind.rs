//! Message kind tags.

use std::fmt;

/// Message kinds understood by this client.
///
/// The numeric tags match the remote's message enumeration. Tags not listed
/// here are unknown to the client and are discarded by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Response to a unified service method call.
    ServiceMethodResponse,
    /// Unified service method call issued before logon.
    ServiceMethodCallFromClientNonAuthed,
    /// Logon request carrying the refresh token.
    ClientLogOn,
    /// Result of a logon request.
    ClientLogOnResponse,
    /// Polite logoff request.
    ClientLogOff,
    /// Remote ended the logged-on session.
    ClientLoggedOff,
    /// Account details sent after a successful logon.
    ClientAccountInfo,
    /// Persona (presence) state change.
    ClientChangeStatus,
    /// Announces the applications currently being played.
    ClientGamesPlayed,
    /// Request for the generic ownership ticket.
    ClientGetAppOwnershipTicket,
    /// Ownership ticket response.
    ClientGetAppOwnershipTicketResponse,
    /// Request for the encrypted app ticket.
    ClientRequestEncryptedAppTicket,
    /// Encrypted app ticket response.
    ClientRequestEncryptedAppTicketResponse,
}

impl MessageKind {
    /// Every known kind, in tag order.
    pub const ALL: [MessageKind; 13] = [
        MessageKind::ServiceMethodResponse,
        MessageKind::ClientChangeStatus,
        MessageKind::ClientLogOnResponse,
        MessageKind::ClientLoggedOff,
        MessageKind::ClientAccountInfo,
        MessageKind::ClientGetAppOwnershipTicket,
        MessageKind::ClientGetAppOwnershipTicketResponse,
        MessageKind::ClientGamesPlayed,
        MessageKind::ClientLogOn,
        MessageKind::ClientLogOff,
        MessageKind::ClientRequestEncryptedAppTicket,
        MessageKind::ClientRequestEncryptedAppTicketResponse,
        MessageKind::ServiceMethodCallFromClientNonAuthed,
    ];

    /// Wire tag for this kind.
    pub fn tag(self) -> u32 {
        match self {
            MessageKind::ServiceMethodResponse => 147,
            MessageKind::ClientChangeStatus => 716,
            MessageKind::ClientLogOnResponse => 751,
            MessageKind::ClientLoggedOff => 757,
            MessageKind::ClientAccountInfo => 768,
            MessageKind::ClientGetAppOwnershipTicket => 857,
            MessageKind::ClientGetAppOwnershipTicketResponse => 858,
            MessageKind::ClientGamesPlayed => 5410,
            MessageKind::ClientLogOn => 5514,
            MessageKind::ClientLogOff => 706,
            MessageKind::ClientRequestEncryptedAppTicket => 5526,
            MessageKind::ClientRequestEncryptedAppTicketResponse => 5527,
            MessageKind::ServiceMethodCallFromClientNonAuthed => 9804,
        }
    }

    /// Look up a kind by wire tag. Returns `None` for unknown tags.
    pub fn from_tag(tag: u32) -> Option<Self> {
        MessageKind::ALL.iter().copied().find(|kind| kind.tag() == tag)
    }

    /// Returns the name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::ServiceMethodResponse => "ServiceMethodResponse",
            MessageKind::ServiceMethodCallFromClientNonAuthed => {
                "ServiceMethodCallFromClientNonAuthed"
            }
            MessageKind::ClientLogOn => "ClientLogOn",
            MessageKind::ClientLogOnResponse => "ClientLogOnResponse",
            MessageKind::ClientLogOff => "ClientLogOff",
            MessageKind::ClientLoggedOff => "ClientLoggedOff",
            MessageKind::ClientAccountInfo => "ClientAccountInfo",
            MessageKind::ClientChangeStatus => "ClientChangeStatus",
            MessageKind::ClientGamesPlayed => "ClientGamesPlayed",
            MessageKind::ClientGetAppOwnershipTicket => "ClientGetAppOwnershipTicket",
            MessageKind::ClientGetAppOwnershipTicketResponse => {
                "ClientGetAppOwnershipTicketResponse"
            }
            MessageKind::ClientRequestEncryptedAppTicket => "ClientRequestEncryptedAppTicket",
            MessageKind::ClientRequestEncryptedAppTicketResponse => {
                "ClientRequestEncryptedAppTicketResponse"
            }
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tags_round_trip() {
        for kind in MessageKind::ALL {
            assert_eq!(MessageKind::from_tag(kind.tag()), Some(kind));
        }
    }

    #[test]
    fn test_tags_are_unique() {
        let tags: HashSet<u32> = MessageKind::ALL.iter().map(|k| k.tag()).collect();
        assert_eq!(tags.len(), MessageKind::ALL.len());
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(MessageKind::from_tag(0), None);
        assert_eq!(MessageKind::from_tag(99_999), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            MessageKind::ClientRequestEncryptedAppTicketResponse.to_string(),
            "ClientRequestEncryptedAppTicketResponse"
        );
    }
}
