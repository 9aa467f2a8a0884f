use async_trait::async_trait;

use crate::protocol::ConfirmationKind;

use super::{GuardCodeError, GuardCodeProvider};

/// Provider that never has a code.
/// A flow using it fails as soon as the remote asks for one.
pub struct NoGuardCodeProvider;

impl NoGuardCodeProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoGuardCodeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GuardCodeProvider for NoGuardCodeProvider {
    async fn guard_code(
        &self,
        kind: ConfirmationKind,
        _hint: Option<&str>,
    ) -> Result<String, GuardCodeError> {
        Err(GuardCodeError::Unavailable(kind))
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_none_provider_has_no_code() {
        let provider = NoGuardCodeProvider::new();
        let result = provider.guard_code(ConfirmationKind::EmailCode, None).await;
        assert!(matches!(
            result,
            Err(GuardCodeError::Unavailable(ConfirmationKind::EmailCode))
        ));
    }

    #[test]
    fn test_none_provider_method_name() {
        assert_eq!(NoGuardCodeProvider::new().method_name(), "none");
    }
}
