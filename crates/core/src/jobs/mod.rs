//! Request/response correlation.
//!
//! Every correlated request carries a fresh job id. The remote echoes it as the
//! target job of its response, and the dispatcher hands matching responses to
//! the `JobCorrelator`, which completes the awaiting `JobHandle`.

mod correlator;
mod types;

pub use correlator::{JobCorrelator, JobHandle};
pub use types::JobError;
