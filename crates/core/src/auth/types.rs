use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::guard::GuardStoreError;
use crate::jobs::JobError;
use crate::protocol::{MessageKind, ResultCode, SteamId};
use crate::session::SessionError;
use crate::ticket::TicketError;
use crate::transport::TransportError;

use super::GuardCodeError;

/// Account credentials.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The step of the flow an error happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStep {
    Connect,
    BeginAuth,
    SubmitGuardCode,
    PollAuth,
    LogOn,
    AccountInfo,
    Presence,
    OwnershipTicket,
    EncryptedTicket,
}

impl FlowStep {
    pub fn as_str(self) -> &'static str {
        match self {
            FlowStep::Connect => "connect",
            FlowStep::BeginAuth => "credential auth",
            FlowStep::SubmitGuardCode => "guard code submission",
            FlowStep::PollAuth => "auth status poll",
            FlowStep::LogOn => "logon",
            FlowStep::AccountInfo => "account info",
            FlowStep::Presence => "presence announcement",
            FlowStep::OwnershipTicket => "ownership ticket request",
            FlowStep::EncryptedTicket => "encrypted ticket request",
        }
    }
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a completed flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowOutcome {
    pub app_id: u32,
    pub steam_id: SteamId,
    /// Numeric account id embedded in the encrypted record.
    pub account_id: u32,
    pub ownership_path: PathBuf,
    pub encrypted_path: PathBuf,
}

/// Why the flow ended in `Failed`.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A message kind the flow depends on has no decoder.
    #[error("Required capability unavailable: no decoder for {0}")]
    CapabilityUnavailable(MessageKind),

    /// The remote answered a request with a non-OK result.
    #[error("{step} rejected by remote: {result}")]
    RemoteResult { step: FlowStep, result: ResultCode },

    #[error("Disconnected during {step}")]
    Disconnected { step: FlowStep },

    #[error("Timed out during {step}")]
    Timeout { step: FlowStep },

    /// The remote ended the session after logon.
    #[error("Logged off by remote: {0}")]
    LoggedOff(ResultCode),

    /// The remote sent something that does not fit the step.
    #[error("Unexpected response during {step}: {reason}")]
    Protocol { step: FlowStep, reason: String },

    #[error("Guard store error: {0}")]
    GuardStore(#[from] GuardStoreError),

    #[error("Ticket error: {0}")]
    Ticket(#[from] TicketError),

    #[error("Guard code error: {0}")]
    GuardCode(#[from] GuardCodeError),

    #[error("Transport error during {step}: {source}")]
    Transport {
        step: FlowStep,
        #[source]
        source: TransportError,
    },
}

impl FlowError {
    pub(crate) fn from_transport(step: FlowStep, error: TransportError) -> Self {
        match error {
            TransportError::Closed | TransportError::NotConnected => {
                FlowError::Disconnected { step }
            }
            source => FlowError::Transport { step, source },
        }
    }

    pub(crate) fn from_job(step: FlowStep, error: JobError) -> Self {
        match error {
            JobError::Timeout { .. } => FlowError::Timeout { step },
            JobError::SessionClosed => FlowError::Disconnected { step },
            JobError::Transport(e) => FlowError::from_transport(step, e),
            other @ (JobError::Malformed { .. }
            | JobError::UnexpectedResponse { .. }
            | JobError::Protocol(_)) => FlowError::Protocol {
                step,
                reason: other.to_string(),
            },
        }
    }

    pub(crate) fn from_session(step: FlowStep, error: SessionError) -> Self {
        match error {
            SessionError::Closed => FlowError::Disconnected { step },
            SessionError::Transport(e) => FlowError::from_transport(step, e),
            SessionError::Protocol(e) => FlowError::Protocol {
                step,
                reason: e.to_string(),
            },
        }
    }

    /// Fail with `RemoteResult` unless `result` is OK.
    pub(crate) fn check(step: FlowStep, result: ResultCode) -> Result<(), FlowError> {
        if result.is_ok() {
            Ok(())
        } else {
            Err(FlowError::RemoteResult { step, result })
        }
    }

    /// Whether the run ended because the connection went away.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, FlowError::Disconnected { .. })
    }
}
