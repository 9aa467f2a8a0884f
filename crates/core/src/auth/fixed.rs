use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::debug;

use crate::protocol::ConfirmationKind;

use super::{GuardCodeError, GuardCodeProvider};

/// Provider answering every request with a code supplied up front, e.g. on
/// the command line.
pub struct FixedGuardCodeProvider {
    code: String,
    requests: AtomicUsize,
}

impl FixedGuardCodeProvider {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            requests: AtomicUsize::new(0),
        }
    }

    /// How many times a code was requested.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GuardCodeProvider for FixedGuardCodeProvider {
    async fn guard_code(
        &self,
        kind: ConfirmationKind,
        _hint: Option<&str>,
    ) -> Result<String, GuardCodeError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let code = self.code.trim();
        if code.is_empty() {
            return Err(GuardCodeError::Unavailable(kind));
        }
        debug!("Using preset guard code for {:?}", kind);
        Ok(code.to_string())
    }

    fn method_name(&self) -> &'static str {
        "fixed"
    }
}
