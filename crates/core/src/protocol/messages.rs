//! Message bodies used by the login and ticket flows.

use serde::{Deserialize, Serialize};

use super::{MessageKind, ResultCode, SteamId};

/// A message the client sends.
pub trait Outbound: Serialize {
    const KIND: MessageKind;
}

/// A decoded message the client can await as the result of a job.
pub trait Response: Sized {
    /// Kind of packet that carries this response.
    const KIND: MessageKind;

    /// Narrow a decoded inbound message to this type, handing it back if it
    /// is some other message.
    fn from_inbound(message: Inbound) -> Result<Self, Inbound>;
}

// ============================================================================
// Authentication service
// ============================================================================

/// Which device-guard confirmation the remote accepts for a pending session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationKind {
    /// No confirmation needed (stored guard data was accepted).
    None,
    /// Code sent to the account's email address.
    EmailCode,
    /// Code from the mobile authenticator.
    DeviceCode,
    /// Approval prompt on the mobile authenticator.
    DeviceConfirmation,
    /// Confirmation link sent by email.
    EmailConfirmation,
}

impl ConfirmationKind {
    /// Whether this confirmation requires the user to type a code.
    pub fn needs_code(self) -> bool {
        matches!(self, ConfirmationKind::EmailCode | ConfirmationKind::DeviceCode)
    }
}

/// One confirmation option offered by the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedConfirmation {
    pub confirmation_type: ConfirmationKind,
    /// Hint shown to the user, e.g. the email domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_message: Option<String>,
}

/// Service method calls issued before logon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum ServiceRequest {
    BeginAuthSessionViaCredentials(BeginAuthSession),
    PollAuthSessionStatus(PollAuthSession),
    UpdateAuthSessionWithSteamGuardCode(SubmitGuardCode),
}

impl Outbound for ServiceRequest {
    const KIND: MessageKind = MessageKind::ServiceMethodCallFromClientNonAuthed;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeginAuthSession {
    pub account_name: String,
    pub password: String,
    pub persistence: bool,
    pub website_id: String,
    pub device_friendly_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard_data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollAuthSession {
    pub client_id: u64,
    pub request_id: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitGuardCode {
    pub client_id: u64,
    pub steamid: SteamId,
    pub code: String,
    pub code_type: ConfirmationKind,
}

/// Service method responses, tagged by the method they answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum ServiceResponse {
    BeginAuthSessionViaCredentials(BeginAuthSessionResponse),
    PollAuthSessionStatus(PollAuthSessionResponse),
    UpdateAuthSessionWithSteamGuardCode(SubmitGuardCodeResponse),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeginAuthSessionResponse {
    pub eresult: ResultCode,
    #[serde(default)]
    pub client_id: u64,
    #[serde(default)]
    pub request_id: Vec<u8>,
    /// Suggested poll interval in seconds.
    #[serde(default)]
    pub interval: f32,
    #[serde(default)]
    pub allowed_confirmations: Vec<AllowedConfirmation>,
    #[serde(default)]
    pub steamid: Option<SteamId>,
}

impl BeginAuthSessionResponse {
    /// The confirmation the client should act on.
    ///
    /// A code-free option wins over code entry, matching the order the remote
    /// lists them in.
    pub fn preferred_confirmation(&self) -> Option<&AllowedConfirmation> {
        self.allowed_confirmations
            .iter()
            .find(|c| !c.confirmation_type.needs_code())
            .or_else(|| self.allowed_confirmations.first())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PollAuthSessionResponse {
    pub eresult: ResultCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_client_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_guard_data: Option<String>,
    #[serde(default)]
    pub had_remote_interaction: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitGuardCodeResponse {
    pub eresult: ResultCode,
}

// ============================================================================
// Logon and presence
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogOn {
    pub account_name: String,
    pub access_token: String,
    pub should_remember_password: bool,
    pub protocol_version: u32,
}

impl Outbound for LogOn {
    const KIND: MessageKind = MessageKind::ClientLogOn;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogOnResponse {
    pub eresult: ResultCode,
    #[serde(default)]
    pub steamid: SteamId,
    #[serde(default)]
    pub heartbeat_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogOff {}

impl Outbound for LogOff {
    const KIND: MessageKind = MessageKind::ClientLogOff;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedOff {
    pub eresult: ResultCode,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub persona_name: String,
    #[serde(default)]
    pub ip_country: String,
}

/// Persona states for presence announcements.
pub const PERSONA_STATE_ONLINE: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub persona_state: u32,
}

impl Outbound for ChangeStatus {
    const KIND: MessageKind = MessageKind::ClientChangeStatus;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamePlayed {
    pub game_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamesPlayed {
    pub games_played: Vec<GamePlayed>,
}

impl GamesPlayed {
    pub fn single(app_id: u32) -> Self {
        Self {
            games_played: vec![GamePlayed {
                game_id: u64::from(app_id),
            }],
        }
    }
}

impl Outbound for GamesPlayed {
    const KIND: MessageKind = MessageKind::ClientGamesPlayed;
}

// ============================================================================
// Tickets
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetAppOwnershipTicket {
    pub app_id: u32,
}

impl Outbound for GetAppOwnershipTicket {
    const KIND: MessageKind = MessageKind::ClientGetAppOwnershipTicket;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipTicketResponse {
    pub eresult: ResultCode,
    pub app_id: u32,
    #[serde(default)]
    pub ticket: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEncryptedAppTicket {
    pub app_id: u32,
    #[serde(default)]
    pub userdata: Vec<u8>,
}

impl Outbound for RequestEncryptedAppTicket {
    const KIND: MessageKind = MessageKind::ClientRequestEncryptedAppTicket;
}

/// Encrypted ticket as issued by the remote.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EncryptedAppTicket {
    #[serde(default)]
    pub ticket_version_no: u32,
    #[serde(default)]
    pub crc_encryptedticket: u32,
    #[serde(default)]
    pub cb_encrypteduserdata: u32,
    #[serde(default)]
    pub cb_encrypted_appownershipticket: u32,
    pub encrypted_ticket: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedTicketResponse {
    pub eresult: ResultCode,
    pub app_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_app_ticket: Option<EncryptedAppTicket>,
}

// ============================================================================
// Decoded inbound messages
// ============================================================================

/// Every inbound message the client decodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Service(ServiceResponse),
    LogOnResponse(LogOnResponse),
    LoggedOff(LoggedOff),
    AccountInfo(AccountInfo),
    OwnershipTicket(OwnershipTicketResponse),
    EncryptedTicket(EncryptedTicketResponse),
}

impl Inbound {
    /// Kind of packet this message was decoded from.
    pub fn kind(&self) -> MessageKind {
        match self {
            Inbound::Service(_) => MessageKind::ServiceMethodResponse,
            Inbound::LogOnResponse(_) => MessageKind::ClientLogOnResponse,
            Inbound::LoggedOff(_) => MessageKind::ClientLoggedOff,
            Inbound::AccountInfo(_) => MessageKind::ClientAccountInfo,
            Inbound::OwnershipTicket(_) => MessageKind::ClientGetAppOwnershipTicketResponse,
            Inbound::EncryptedTicket(_) => MessageKind::ClientRequestEncryptedAppTicketResponse,
        }
    }
}

impl Response for BeginAuthSessionResponse {
    const KIND: MessageKind = MessageKind::ServiceMethodResponse;

    fn from_inbound(message: Inbound) -> Result<Self, Inbound> {
        match message {
            Inbound::Service(ServiceResponse::BeginAuthSessionViaCredentials(r)) => Ok(r),
            other => Err(other),
        }
    }
}

impl Response for PollAuthSessionResponse {
    const KIND: MessageKind = MessageKind::ServiceMethodResponse;

    fn from_inbound(message: Inbound) -> Result<Self, Inbound> {
        match message {
            Inbound::Service(ServiceResponse::PollAuthSessionStatus(r)) => Ok(r),
            other => Err(other),
        }
    }
}

impl Response for SubmitGuardCodeResponse {
    const KIND: MessageKind = MessageKind::ServiceMethodResponse;

    fn from_inbound(message: Inbound) -> Result<Self, Inbound> {
        match message {
            Inbound::Service(ServiceResponse::UpdateAuthSessionWithSteamGuardCode(r)) => Ok(r),
            other => Err(other),
        }
    }
}

impl Response for OwnershipTicketResponse {
    const KIND: MessageKind = MessageKind::ClientGetAppOwnershipTicketResponse;

    fn from_inbound(message: Inbound) -> Result<Self, Inbound> {
        match message {
            Inbound::OwnershipTicket(r) => Ok(r),
            other => Err(other),
        }
    }
}

impl Response for EncryptedTicketResponse {
    const KIND: MessageKind = MessageKind::ClientRequestEncryptedAppTicketResponse;

    fn from_inbound(message: Inbound) -> Result<Self, Inbound> {
        match message {
            Inbound::EncryptedTicket(r) => Ok(r),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_request_is_tagged_by_method() {
        let request = ServiceRequest::PollAuthSessionStatus(PollAuthSession {
            client_id: 5,
            request_id: vec![1],
        });
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["method"], "PollAuthSessionStatus");
        assert_eq!(json["client_id"], 5);
    }

    #[test]
    fn test_poll_response_defaults() {
        let json = r#"{"method":"PollAuthSessionStatus","eresult":1}"#;
        let parsed: ServiceResponse = serde_json::from_str(json).unwrap();
        match parsed {
            ServiceResponse::PollAuthSessionStatus(r) => {
                assert!(r.eresult.is_ok());
                assert!(r.refresh_token.is_none());
                assert!(r.new_guard_data.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_preferred_confirmation_skips_code_when_possible() {
        let response = BeginAuthSessionResponse {
            eresult: ResultCode::OK,
            client_id: 1,
            request_id: vec![],
            interval: 0.1,
            allowed_confirmations: vec![
                AllowedConfirmation {
                    confirmation_type: ConfirmationKind::DeviceCode,
                    associated_message: None,
                },
                AllowedConfirmation {
                    confirmation_type: ConfirmationKind::DeviceConfirmation,
                    associated_message: None,
                },
            ],
            steamid: None,
        };
        assert_eq!(
            response.preferred_confirmation().unwrap().confirmation_type,
            ConfirmationKind::DeviceConfirmation
        );
    }

    #[test]
    fn test_preferred_confirmation_code_only() {
        let response = BeginAuthSessionResponse {
            eresult: ResultCode::OK,
            client_id: 1,
            request_id: vec![],
            interval: 0.1,
            allowed_confirmations: vec![AllowedConfirmation {
                confirmation_type: ConfirmationKind::EmailCode,
                associated_message: Some("example.com".to_string()),
            }],
            steamid: None,
        };
        let preferred = response.preferred_confirmation().unwrap();
        assert!(preferred.confirmation_type.needs_code());
    }

    #[test]
    fn test_response_narrowing() {
        let inbound = Inbound::OwnershipTicket(OwnershipTicketResponse {
            eresult: ResultCode::OK,
            app_id: 730,
            ticket: vec![],
        });
        assert_eq!(inbound.kind(), OwnershipTicketResponse::KIND);
        assert!(OwnershipTicketResponse::from_inbound(inbound.clone()).is_ok());
        assert!(EncryptedTicketResponse::from_inbound(inbound).is_err());
    }

    #[test]
    fn test_games_played_single() {
        let msg = GamesPlayed::single(730);
        assert_eq!(msg.games_played, vec![GamePlayed { game_id: 730 }]);
    }
}
