//! One connection to the remote: transport, dispatcher, job table and the
//! bounded-wait pump that feeds inbound packets through them.

mod pump;
mod types;

pub use pump::Session;
pub use types::{PumpStatus, SessionError};
