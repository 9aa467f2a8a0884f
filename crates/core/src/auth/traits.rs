use async_trait::async_trait;
use thiserror::Error;

use crate::protocol::ConfirmationKind;

#[derive(Debug, Error)]
pub enum GuardCodeError {
    #[error("No guard code available for {0:?} confirmation")]
    Unavailable(ConfirmationKind),

    #[error("Guard code entry cancelled")]
    Cancelled,

    #[error("Failed to read guard code: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of the codes the remote asks for when it wants an email or
/// authenticator code.
#[async_trait]
pub trait GuardCodeProvider: Send + Sync {
    /// Obtain a code for `kind`. `hint` is the remote's description of where
    /// the code was sent, if any.
    async fn guard_code(
        &self,
        kind: ConfirmationKind,
        hint: Option<&str>,
    ) -> Result<String, GuardCodeError>;

    /// Name of this provider for logging.
    fn method_name(&self) -> &'static str;
}
