//! Authentication and ticket retrieval.
//!
//! `AuthFlow` walks the states in [`AuthState`] over a [`Session`]:
//! credential auth with optional guard code, status polling, logon, presence
//! announcement, then the two ticket requests. Guard codes come from a
//! [`GuardCodeProvider`].
//!
//! [`Session`]: crate::session::Session

mod fixed;
mod flow;
mod none;
mod state;
mod traits;
mod types;

pub use fixed::*;
pub use flow::{AuthFlow, FlowContext, REQUIRED_KINDS};
pub use none::*;
pub use state::AuthState;
pub use traits::*;
pub use types::*;
