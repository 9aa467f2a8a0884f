//! The login and ticket retrieval state machine.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::guard::{validate_username, GuardStore};
use crate::jobs::JobError;
use crate::protocol::{
    AccountInfo, AllowedConfirmation, BeginAuthSession, BeginAuthSessionResponse, ChangeStatus,
    EncryptedTicketResponse, GamesPlayed, GetAppOwnershipTicket, Inbound, LogOff, LogOn,
    LogOnResponse, MessageKind, Outbound, OwnershipTicketResponse, PollAuthSession,
    PollAuthSessionResponse, RequestEncryptedAppTicket, Response, ResultCode, ServiceRequest,
    SteamId, SubmitGuardCode, SubmitGuardCodeResponse, PERSONA_STATE_ONLINE,
};
use crate::session::Session;
use crate::ticket::{encrypted_record, ownership_record, AppTicket, EncryptedTicket, TicketWriter};

use super::{AuthState, Credentials, FlowError, FlowOutcome, FlowStep, GuardCodeProvider};

/// Protocol version reported on logon.
const PROTOCOL_VERSION: u32 = 65_580;

/// Website id the credential session is opened for.
const WEBSITE_ID: &str = "Client";

/// Inbound kinds the flow cannot run without.
pub const REQUIRED_KINDS: [MessageKind; 6] = [
    MessageKind::ServiceMethodResponse,
    MessageKind::ClientLogOnResponse,
    MessageKind::ClientLoggedOff,
    MessageKind::ClientAccountInfo,
    MessageKind::ClientGetAppOwnershipTicketResponse,
    MessageKind::ClientRequestEncryptedAppTicketResponse,
];

/// Uncorrelated messages the flow waits for.
#[derive(Debug)]
enum FlowEvent {
    LoggedOn(LogOnResponse),
    AccountInfo(AccountInfo),
    LoggedOff(ResultCode),
}

/// What the credential session hands over for logon.
struct AuthTokens {
    account_name: String,
    refresh_token: String,
    /// Replacement guard data, persisted once logon succeeds.
    new_guard_data: Option<String>,
}

/// Collaborators of an `AuthFlow`.
pub struct FlowContext {
    pub settings: SessionConfig,
    pub guard_store: Arc<dyn GuardStore>,
    pub tickets: TicketWriter,
    pub codes: Arc<dyn GuardCodeProvider>,
}

/// Drives one run: connect, authenticate, log on, fetch and persist both
/// tickets for one application.
pub struct AuthFlow {
    session: Session,
    context: FlowContext,
    credentials: Credentials,
    app_id: u32,
    events: mpsc::UnboundedReceiver<FlowEvent>,
    state: AuthState,
}

impl AuthFlow {
    /// Build a flow over `session`.
    ///
    /// Fails with `CapabilityUnavailable` when the session cannot decode a
    /// message kind the flow depends on, and with a guard store error for a
    /// username that cannot key a guard file. Nothing is sent in either case.
    pub fn new(
        session: Session,
        context: FlowContext,
        credentials: Credentials,
        app_id: u32,
    ) -> Result<Self, FlowError> {
        let dispatcher = session.dispatcher();
        if let Some(kind) = REQUIRED_KINDS.into_iter().find(|k| !dispatcher.supports(*k)) {
            return Err(FlowError::CapabilityUnavailable(kind));
        }
        validate_username(&credentials.username)?;

        let (tx, events) = mpsc::unbounded_channel();
        for kind in [
            MessageKind::ClientLogOnResponse,
            MessageKind::ClientAccountInfo,
            MessageKind::ClientLoggedOff,
        ] {
            let tx = tx.clone();
            dispatcher.subscribe(kind, move |message| {
                let event = match message {
                    Inbound::LogOnResponse(r) => FlowEvent::LoggedOn(r.clone()),
                    Inbound::AccountInfo(info) => FlowEvent::AccountInfo(info.clone()),
                    Inbound::LoggedOff(off) => FlowEvent::LoggedOff(off.eresult),
                    _ => return,
                };
                let _ = tx.send(event);
            });
        }

        Ok(Self {
            session,
            context,
            credentials,
            app_id,
            events,
            state: AuthState::Disconnected,
        })
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run the flow to a terminal state, pumping the session alongside.
    ///
    /// On failure the session is closed before returning.
    pub async fn run(&mut self) -> Result<FlowOutcome, FlowError> {
        let pump = self.session.clone().run_pump();
        tokio::pin!(pump);

        let result = {
            let drive = self.drive();
            tokio::pin!(drive);
            tokio::select! {
                result = &mut drive => result,
                // The pump only stops on disconnect; the flow then fails fast.
                () = &mut pump => drive.await,
            }
        };

        if let Err(e) = &result {
            warn!("Flow failed in state {}: {}", self.state, e);
            self.state.advance(AuthState::Failed);
            self.session.close().await;
        }
        result
    }

    async fn drive(&mut self) -> Result<FlowOutcome, FlowError> {
        self.session
            .connect()
            .await
            .map_err(|e| FlowError::from_session(FlowStep::Connect, e))?;
        self.state.advance(AuthState::Connected);

        let tokens = self.authenticate().await?;
        let steam_id = self.log_on(tokens).await?;
        self.request_tickets(steam_id).await
    }

    fn job_deadline(&self) -> Option<Duration> {
        Some(self.context.settings.job_timeout())
    }

    /// Correlated call issued before logon.
    async fn call<R: Response, M: Outbound>(
        &self,
        step: FlowStep,
        message: &M,
    ) -> Result<R, FlowError> {
        self.session
            .jobs()
            .call(message, self.job_deadline())
            .await
            .map_err(|e: JobError| FlowError::from_job(step, e))
    }

    /// Correlated call issued while logged on. A log-off from the remote
    /// ends the wait.
    async fn online_call<R: Response, M: Outbound>(
        &mut self,
        step: FlowStep,
        message: &M,
    ) -> Result<R, FlowError> {
        let deadline = self.job_deadline();
        let call = self.session.jobs().call::<R, M>(message, deadline);
        tokio::pin!(call);

        loop {
            tokio::select! {
                result = &mut call => return result.map_err(|e| FlowError::from_job(step, e)),
                event = self.events.recv() => match event {
                    Some(FlowEvent::LoggedOff(result)) => return Err(FlowError::LoggedOff(result)),
                    Some(other) => debug!("Ignoring {:?} during {}", other, step),
                    None => return Err(FlowError::Disconnected { step }),
                },
            }
        }
    }

    /// Wait for the next uncorrelated event, bounded by the job timeout.
    async fn next_event(&mut self, step: FlowStep) -> Result<FlowEvent, FlowError> {
        let mut closed = self.session.closed();
        let timeout = self.context.settings.job_timeout();

        tokio::select! {
            biased;
            event = self.events.recv() => event.ok_or(FlowError::Disconnected { step }),
            _ = closed.wait_for(|closed| *closed) => Err(FlowError::Disconnected { step }),
            () = tokio::time::sleep(timeout) => Err(FlowError::Timeout { step }),
        }
    }

    /// Await `work` unless the session closes or `deadline` passes first.
    async fn until_closed_or<T>(
        &self,
        step: FlowStep,
        deadline: Instant,
        work: impl Future<Output = Result<T, FlowError>>,
    ) -> Result<T, FlowError> {
        let mut closed = self.session.closed();

        tokio::select! {
            biased;
            _ = closed.wait_for(|closed| *closed) => Err(FlowError::Disconnected { step }),
            result = work => result,
            () = tokio::time::sleep_until(deadline) => Err(FlowError::Timeout { step }),
        }
    }

    async fn authenticate(&mut self) -> Result<AuthTokens, FlowError> {
        let username = self.credentials.username.clone();
        let guard_data = self.context.guard_store.load(&username).await?;
        if guard_data.is_some() {
            debug!("Offering stored guard data for {}", username);
        }

        // Guard confirmation and polling share one budget.
        let deadline = Instant::now() + self.context.settings.auth_timeout();

        self.state.advance(AuthState::CredentialAuthPending);
        let request = ServiceRequest::BeginAuthSessionViaCredentials(BeginAuthSession {
            account_name: username.clone(),
            password: self.credentials.password.clone(),
            persistence: self.context.settings.persistent_session,
            website_id: WEBSITE_ID.to_string(),
            device_friendly_name: self.context.settings.device_name.clone(),
            guard_data,
        });
        let begin: BeginAuthSessionResponse = self.call(FlowStep::BeginAuth, &request).await?;
        FlowError::check(FlowStep::BeginAuth, begin.eresult)?;

        match begin.preferred_confirmation() {
            Some(confirmation) if confirmation.confirmation_type.needs_code() => {
                let steam_id = begin.steamid.unwrap_or_default();
                self.submit_guard_code(begin.client_id, steam_id, confirmation, deadline)
                    .await?;
            }
            Some(confirmation) => {
                debug!("Confirmation {:?} needs no code", confirmation.confirmation_type)
            }
            None => {}
        }

        self.state.advance(AuthState::GuardPolling);
        let interval = Duration::try_from_secs_f32(begin.interval)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| self.context.settings.auth_poll_interval());
        let tokens = self
            .poll_auth_session(begin.client_id, begin.request_id, interval, deadline)
            .await?;

        self.state.advance(AuthState::LoggingOn);
        Ok(tokens)
    }

    async fn submit_guard_code(
        &self,
        client_id: u64,
        steamid: SteamId,
        confirmation: &AllowedConfirmation,
        deadline: Instant,
    ) -> Result<(), FlowError> {
        let kind = confirmation.confirmation_type;
        info!(
            "Remote requires a {:?} guard code (via {})",
            kind,
            self.context.codes.method_name()
        );
        let entry = async {
            self.context
                .codes
                .guard_code(kind, confirmation.associated_message.as_deref())
                .await
                .map_err(FlowError::from)
        };
        let code = self
            .until_closed_or(FlowStep::SubmitGuardCode, deadline, entry)
            .await?;

        let request = ServiceRequest::UpdateAuthSessionWithSteamGuardCode(SubmitGuardCode {
            client_id,
            steamid,
            code,
            code_type: kind,
        });
        let response: SubmitGuardCodeResponse =
            self.call(FlowStep::SubmitGuardCode, &request).await?;
        FlowError::check(FlowStep::SubmitGuardCode, response.eresult)
    }

    /// Poll the auth session until the remote issues tokens.
    async fn poll_auth_session(
        &self,
        mut client_id: u64,
        request_id: Vec<u8>,
        interval: Duration,
        deadline: Instant,
    ) -> Result<AuthTokens, FlowError> {

        loop {
            let request = ServiceRequest::PollAuthSessionStatus(PollAuthSession {
                client_id,
                request_id: request_id.clone(),
            });
            let poll: PollAuthSessionResponse = self.call(FlowStep::PollAuth, &request).await?;
            FlowError::check(FlowStep::PollAuth, poll.eresult)?;

            if let Some(new_id) = poll.new_client_id {
                if new_id != client_id {
                    debug!("Auth session moved to client id {}", new_id);
                    client_id = new_id;
                }
            }

            if let Some(refresh_token) = poll.refresh_token {
                let account_name = poll
                    .account_name
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| self.credentials.username.clone());
                return Ok(AuthTokens {
                    account_name,
                    refresh_token,
                    new_guard_data: poll.new_guard_data,
                });
            }

            if Instant::now() + interval > deadline {
                return Err(FlowError::Timeout {
                    step: FlowStep::PollAuth,
                });
            }
            debug!("Auth session pending, polling again in {:?}", interval);
            let wait = async {
                tokio::time::sleep(interval).await;
                Ok::<(), FlowError>(())
            };
            self.until_closed_or(FlowStep::PollAuth, deadline, wait)
                .await?;
        }
    }

    async fn log_on(&mut self, tokens: AuthTokens) -> Result<SteamId, FlowError> {
        let new_guard_data = tokens.new_guard_data;
        self.session
            .send(&LogOn {
                account_name: tokens.account_name,
                access_token: tokens.refresh_token,
                should_remember_password: self.context.settings.persistent_session,
                protocol_version: PROTOCOL_VERSION,
            })
            .await
            .map_err(|e| FlowError::from_session(FlowStep::LogOn, e))?;

        // Account info may overtake the logon response.
        let mut account_info = None;
        let response = loop {
            match self.next_event(FlowStep::LogOn).await? {
                FlowEvent::LoggedOn(response) => break response,
                FlowEvent::AccountInfo(info) => account_info = Some(info),
                FlowEvent::LoggedOff(result) => return Err(FlowError::LoggedOff(result)),
            }
        };
        FlowError::check(FlowStep::LogOn, response.eresult)?;
        if let Some(blob) = new_guard_data.as_deref() {
            self.context
                .guard_store
                .store(&self.credentials.username, blob)
                .await?;
        }
        let steam_id = response.steamid;
        self.state.advance(AuthState::Online);

        let info = match account_info {
            Some(info) => info,
            None => loop {
                match self.next_event(FlowStep::AccountInfo).await? {
                    FlowEvent::AccountInfo(info) => break info,
                    FlowEvent::LoggedOff(result) => return Err(FlowError::LoggedOff(result)),
                    FlowEvent::LoggedOn(_) => debug!("Ignoring repeated logon response"),
                }
            },
        };
        info!(
            "Logged on as {} (steam id {}, account {})",
            info.persona_name,
            steam_id.0,
            steam_id.account_id()
        );

        self.session
            .send(&ChangeStatus {
                persona_state: PERSONA_STATE_ONLINE,
            })
            .await
            .map_err(|e| FlowError::from_session(FlowStep::Presence, e))?;
        Ok(steam_id)
    }

    async fn request_tickets(&mut self, steam_id: SteamId) -> Result<FlowOutcome, FlowError> {
        let app_id = self.app_id;
        self.state.advance(AuthState::TicketsRequested);

        self.session
            .send(&GamesPlayed::single(app_id))
            .await
            .map_err(|e| FlowError::from_session(FlowStep::Presence, e))?;

        let step = FlowStep::OwnershipTicket;
        let ownership: OwnershipTicketResponse = self
            .online_call(step, &GetAppOwnershipTicket { app_id })
            .await?;
        FlowError::check(step, ownership.eresult)?;
        if ownership.app_id != app_id {
            return Err(FlowError::Protocol {
                step,
                reason: format!("ticket is for app {}, wanted {}", ownership.app_id, app_id),
            });
        }
        let ticket = AppTicket {
            app_id,
            payload: ownership.ticket,
        };
        info!("Got ownership ticket for app {} ({} bytes)", app_id, ticket.payload.len());

        let step = FlowStep::EncryptedTicket;
        let encrypted: EncryptedTicketResponse = self
            .online_call(
                step,
                &RequestEncryptedAppTicket {
                    app_id,
                    userdata: Vec::new(),
                },
            )
            .await?;
        FlowError::check(step, encrypted.eresult)?;
        if encrypted.app_id != app_id {
            return Err(FlowError::Protocol {
                step,
                reason: format!("ticket is for app {}, wanted {}", encrypted.app_id, app_id),
            });
        }
        let Some(body) = encrypted.encrypted_app_ticket else {
            return Err(FlowError::Protocol {
                step,
                reason: "response carries no ticket".to_string(),
            });
        };
        let encrypted = EncryptedTicket::from_message(app_id, body);
        info!(
            "Got encrypted ticket for app {} (version {}, {} bytes)",
            app_id,
            encrypted.version,
            encrypted.payload.len()
        );

        // Encode both before writing either.
        let account_id = steam_id.account_id();
        let ownership_bytes = ownership_record(&ticket.payload)?;
        let encrypted_bytes = encrypted_record(account_id, &encrypted.payload)?;
        let (ownership_path, encrypted_path) = self
            .context
            .tickets
            .write_pair(app_id, &ownership_bytes, &encrypted_bytes)
            .await?;

        self.state.advance(AuthState::Done);
        if let Err(e) = self.session.send(&LogOff {}).await {
            debug!("Log-off not sent: {}", e);
        }
        self.session.close().await;

        Ok(FlowOutcome {
            app_id,
            steam_id,
            account_id,
            ownership_path,
            encrypted_path,
        })
    }
}
