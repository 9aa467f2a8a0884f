pub mod auth;
pub mod config;
pub mod dispatch;
pub mod guard;
pub mod jobs;
mod persist;
pub mod protocol;
pub mod session;
pub mod testing;
pub mod ticket;
pub mod transport;

pub use auth::{
    AuthFlow, AuthState, Credentials, FixedGuardCodeProvider, FlowContext, FlowError,
    FlowOutcome, FlowStep, GuardCodeError, GuardCodeProvider, NoGuardCodeProvider,
};
pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, Config, ConfigError,
};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use guard::{FsGuardStore, GuardStore, GuardStoreError};
pub use jobs::{JobCorrelator, JobError, JobHandle};
pub use protocol::{JobId, MessageKind, Packet, ResultCode, SteamId};
pub use session::{PumpStatus, Session, SessionError};
pub use ticket::{TicketError, TicketWriter, ENCRYPTED_RECORD_LEN, OWNERSHIP_RECORD_LEN};
pub use transport::{TcpTransport, Transport, TransportError};
