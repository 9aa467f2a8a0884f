//! Scripted in-process remote for flow tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::protocol::{
    AccountInfo, AllowedConfirmation, BeginAuthSessionResponse, ConfirmationKind,
    EncryptedAppTicket, EncryptedTicketResponse, GetAppOwnershipTicket, JobId, LogOn,
    LogOnResponse, LoggedOff, MessageKind, OwnershipTicketResponse, Packet,
    PollAuthSessionResponse, ProtocolError, RequestEncryptedAppTicket, ResultCode,
    ServiceRequest, ServiceResponse, SteamId, SubmitGuardCodeResponse,
};
use crate::transport::{Transport, TransportError};

use super::inbox::Inbox;

/// SteamId handed out by the scripted remote. Its account id is 22202.
pub const MOCK_STEAM_ID: SteamId = SteamId(76_561_197_960_287_930);

/// Client id returned by the scripted credential step.
pub const MOCK_CLIENT_ID: u64 = 4_242;

/// How the scripted remote answers each request.
#[derive(Debug, Clone)]
pub struct RemoteScript {
    pub refuse_connect: bool,
    pub begin_result: ResultCode,
    /// Confirmation the remote demands after the credential step.
    pub confirmation: ConfirmationKind,
    pub confirmation_hint: Option<String>,
    /// Code accepted by `UpdateAuthSessionWithSteamGuardCode`.
    pub expected_code: String,
    /// Polls answered with "still pending" before the tokens are issued.
    pub polls_before_ready: u32,
    /// Poll interval the remote advertises, in seconds.
    pub poll_interval: f32,
    pub poll_result: ResultCode,
    pub new_client_id: Option<u64>,
    pub refresh_token: String,
    pub new_guard_data: Option<String>,
    pub logon_result: ResultCode,
    pub steam_id: SteamId,
    /// Send account info ahead of the logon response.
    pub account_info_first: bool,
    pub send_account_info: bool,
    /// Push a log-off right after a successful logon.
    pub log_off_after_logon: Option<ResultCode>,
    pub ownership_result: ResultCode,
    pub ownership_ticket: Vec<u8>,
    /// Answer the ownership request for a different app id.
    pub ownership_app_id: Option<u32>,
    pub encrypted_result: ResultCode,
    pub encrypted_ticket: Option<Vec<u8>>,
    /// Drop the connection when a packet of this kind arrives.
    pub disconnect_on: Option<MessageKind>,
    /// Never answer packets of these kinds.
    pub ignore: Vec<MessageKind>,
}

impl Default for RemoteScript {
    fn default() -> Self {
        Self {
            refuse_connect: false,
            begin_result: ResultCode::OK,
            confirmation: ConfirmationKind::None,
            confirmation_hint: None,
            expected_code: "F00D5".to_string(),
            polls_before_ready: 0,
            poll_interval: 0.05,
            poll_result: ResultCode::OK,
            new_client_id: None,
            refresh_token: "refresh-token".to_string(),
            new_guard_data: Some("guard-blob-1".to_string()),
            logon_result: ResultCode::OK,
            steam_id: MOCK_STEAM_ID,
            account_info_first: false,
            send_account_info: true,
            log_off_after_logon: None,
            ownership_result: ResultCode::OK,
            ownership_ticket: vec![0x14, 0x00, 0x00, 0x00, 0xAA, 0xBB, 0xCC, 0xDD],
            ownership_app_id: None,
            encrypted_result: ResultCode::OK,
            encrypted_ticket: Some(vec![0x5E; 166]),
            disconnect_on: None,
            ignore: Vec::new(),
        }
    }
}

#[derive(Default)]
struct RemoteState {
    connected: bool,
    sent: Vec<Packet>,
    account_name: String,
    offered_guard_data: Vec<Option<String>>,
    submitted_codes: Vec<String>,
    polled_client_ids: Vec<u64>,
    code_accepted: bool,
    polls: u32,
}

/// A Transport answering like the remote would, according to a `RemoteScript`.
///
/// Responses are queued during `send`, addressed to the request's job id.
pub struct MockRemote {
    script: RemoteScript,
    state: Mutex<RemoteState>,
    inbox: Inbox,
    closed: AtomicBool,
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new(RemoteScript::default())
    }
}

impl MockRemote {
    pub fn new(script: RemoteScript) -> Self {
        Self {
            script,
            state: Mutex::new(RemoteState::default()),
            inbox: Inbox::new(),
            closed: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Kinds of every packet received, in order.
    pub fn sent_kinds(&self) -> Vec<MessageKind> {
        self.state()
            .sent
            .iter()
            .filter_map(Packet::message_kind)
            .collect()
    }

    /// Number of received packets of `kind`.
    pub fn count(&self, kind: MessageKind) -> usize {
        self.sent_kinds().into_iter().filter(|k| *k == kind).count()
    }

    /// Guard data offered with each credential request.
    pub fn offered_guard_data(&self) -> Vec<Option<String>> {
        self.state().offered_guard_data.clone()
    }

    pub fn submitted_codes(&self) -> Vec<String> {
        self.state().submitted_codes.clone()
    }

    /// Client id of every status poll, in order.
    pub fn polled_client_ids(&self) -> Vec<u64> {
        self.state().polled_client_ids.clone()
    }

    /// Whether the client closed the connection.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn reply<T: serde::Serialize>(
        &self,
        kind: MessageKind,
        body: &T,
        target: JobId,
    ) -> Result<(), ProtocolError> {
        self.inbox.push(Packet::response(kind, body, target)?);
        Ok(())
    }

    fn answer(&self, packet: &Packet, kind: MessageKind) -> Result<(), ProtocolError> {
        let script = &self.script;
        let job = packet.source_job;

        match kind {
            MessageKind::ServiceMethodCallFromClientNonAuthed => {
                let response = match packet.decode_body::<ServiceRequest>(kind)? {
                    ServiceRequest::BeginAuthSessionViaCredentials(req) => {
                        let mut state = self.state();
                        state.account_name = req.account_name;
                        state.offered_guard_data.push(req.guard_data);
                        ServiceResponse::BeginAuthSessionViaCredentials(
                            BeginAuthSessionResponse {
                                eresult: script.begin_result,
                                client_id: MOCK_CLIENT_ID,
                                request_id: vec![0x52, 0x45, 0x51],
                                interval: script.poll_interval,
                                allowed_confirmations: vec![AllowedConfirmation {
                                    confirmation_type: script.confirmation,
                                    associated_message: script.confirmation_hint.clone(),
                                }],
                                steamid: Some(script.steam_id),
                            },
                        )
                    }
                    ServiceRequest::UpdateAuthSessionWithSteamGuardCode(req) => {
                        let mut state = self.state();
                        let accepted = req.code == script.expected_code;
                        state.code_accepted |= accepted;
                        state.submitted_codes.push(req.code);
                        ServiceResponse::UpdateAuthSessionWithSteamGuardCode(
                            SubmitGuardCodeResponse {
                                eresult: if accepted {
                                    ResultCode::OK
                                } else {
                                    ResultCode::TWO_FACTOR_CODE_MISMATCH
                                },
                            },
                        )
                    }
                    ServiceRequest::PollAuthSessionStatus(req) => {
                        let mut state = self.state();
                        state.polls += 1;
                        state.polled_client_ids.push(req.client_id);
                        let confirmed = !script.confirmation.needs_code() || state.code_accepted;
                        let poll = if !script.poll_result.is_ok() {
                            PollAuthSessionResponse {
                                eresult: script.poll_result,
                                ..Default::default()
                            }
                        } else if confirmed && state.polls > script.polls_before_ready {
                            PollAuthSessionResponse {
                                eresult: ResultCode::OK,
                                new_client_id: script.new_client_id,
                                refresh_token: Some(script.refresh_token.clone()),
                                access_token: Some("access-token".to_string()),
                                account_name: Some(state.account_name.clone()),
                                new_guard_data: script.new_guard_data.clone(),
                                had_remote_interaction: script.confirmation.needs_code(),
                            }
                        } else {
                            PollAuthSessionResponse {
                                eresult: ResultCode::OK,
                                new_client_id: script.new_client_id,
                                ..Default::default()
                            }
                        };
                        ServiceResponse::PollAuthSessionStatus(poll)
                    }
                };
                self.reply(MessageKind::ServiceMethodResponse, &response, job)
            }
            MessageKind::ClientLogOn => {
                let logon: LogOn = packet.decode_body(kind)?;
                let eresult = if logon.access_token == script.refresh_token {
                    script.logon_result
                } else {
                    ResultCode::ACCESS_DENIED
                };
                let info = AccountInfo {
                    persona_name: logon.account_name,
                    ip_country: "SE".to_string(),
                };

                if script.send_account_info && script.account_info_first && eresult.is_ok() {
                    self.reply(MessageKind::ClientAccountInfo, &info, JobId::NONE)?;
                }
                self.reply(
                    MessageKind::ClientLogOnResponse,
                    &LogOnResponse {
                        eresult,
                        steamid: if eresult.is_ok() {
                            script.steam_id
                        } else {
                            SteamId::default()
                        },
                        heartbeat_seconds: 9,
                    },
                    JobId::NONE,
                )?;
                if script.send_account_info && !script.account_info_first && eresult.is_ok() {
                    self.reply(MessageKind::ClientAccountInfo, &info, JobId::NONE)?;
                }
                if let (Some(result), true) = (script.log_off_after_logon, eresult.is_ok()) {
                    self.reply(
                        MessageKind::ClientLoggedOff,
                        &LoggedOff { eresult: result },
                        JobId::NONE,
                    )?;
                }
                Ok(())
            }
            MessageKind::ClientGetAppOwnershipTicket => {
                let req: GetAppOwnershipTicket = packet.decode_body(kind)?;
                let ok = script.ownership_result.is_ok();
                self.reply(
                    MessageKind::ClientGetAppOwnershipTicketResponse,
                    &OwnershipTicketResponse {
                        eresult: script.ownership_result,
                        app_id: script.ownership_app_id.unwrap_or(req.app_id),
                        ticket: if ok {
                            script.ownership_ticket.clone()
                        } else {
                            Vec::new()
                        },
                    },
                    job,
                )
            }
            MessageKind::ClientRequestEncryptedAppTicket => {
                let req: RequestEncryptedAppTicket = packet.decode_body(kind)?;
                let ticket = script
                    .encrypted_ticket
                    .clone()
                    .filter(|_| script.encrypted_result.is_ok())
                    .map(|encrypted_ticket| EncryptedAppTicket {
                        ticket_version_no: 2,
                        crc_encryptedticket: 0x1234_5678,
                        cb_encrypteduserdata: req.userdata.len() as u32,
                        cb_encrypted_appownershipticket: script.ownership_ticket.len() as u32,
                        encrypted_ticket,
                    });
                self.reply(
                    MessageKind::ClientRequestEncryptedAppTicketResponse,
                    &EncryptedTicketResponse {
                        eresult: script.encrypted_result,
                        app_id: req.app_id,
                        encrypted_app_ticket: ticket,
                    },
                    job,
                )
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Transport for MockRemote {
    fn name(&self) -> &str {
        "mock-remote"
    }

    async fn connect(&self) -> Result<(), TransportError> {
        if self.script.refuse_connect {
            return Err(TransportError::ConnectionFailed(
                "connection refused".to_string(),
            ));
        }
        self.state().connected = true;
        Ok(())
    }

    async fn send(&self, packet: Packet) -> Result<(), TransportError> {
        if !self.state().connected {
            return Err(TransportError::NotConnected);
        }
        if self.inbox.is_disconnected() {
            return Err(TransportError::Closed);
        }

        let kind = packet.message_kind();
        self.state().sent.push(packet.clone());

        let Some(kind) = kind else {
            return Ok(());
        };
        if self.script.disconnect_on == Some(kind) {
            self.inbox.disconnect();
            return Ok(());
        }
        if self.script.ignore.contains(&kind) {
            return Ok(());
        }
        self.answer(&packet, kind)?;
        Ok(())
    }

    async fn recv(&self) -> Option<Packet> {
        self.inbox.recv().await
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.inbox.disconnect();
    }
}
