//! Inbound message dispatch.
//!
//! The `Dispatcher` maps message kind tags to decode functions and ordered
//! subscriber lists. Job-id matching is checked before falling back to
//! subscriber broadcast.

mod dispatcher;
mod registry;

pub use dispatcher::{DispatchOutcome, Dispatcher, Handler, SubscriptionId};
pub use registry::{default_decoders, DecodeFn};
