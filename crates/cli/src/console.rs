//! Guard code entry on the terminal.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use ticketgrab_core::protocol::ConfirmationKind;
use ticketgrab_core::{GuardCodeError, GuardCodeProvider};

/// Prompts on stderr and reads the code from stdin.
pub struct ConsoleGuardCodeProvider;

impl ConsoleGuardCodeProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleGuardCodeProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn prompt(kind: ConfirmationKind, hint: Option<&str>) -> String {
    let source = match kind {
        ConfirmationKind::DeviceCode => "your authenticator app",
        _ => "your email",
    };
    match hint {
        Some(hint) if !hint.is_empty() => format!("Enter the code from {} ({}): ", source, hint),
        _ => format!("Enter the code from {}: ", source),
    }
}

#[async_trait]
impl GuardCodeProvider for ConsoleGuardCodeProvider {
    async fn guard_code(
        &self,
        kind: ConfirmationKind,
        hint: Option<&str>,
    ) -> Result<String, GuardCodeError> {
        let prompt = prompt(kind, hint);
        let line = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stderr = io::stderr();
            stderr.write_all(prompt.as_bytes())?;
            stderr.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await
        .map_err(|_| GuardCodeError::Cancelled)??;

        let code = line.trim();
        if code.is_empty() {
            return Err(GuardCodeError::Cancelled);
        }
        Ok(code.to_string())
    }

    fn method_name(&self) -> &'static str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_mentions_hint() {
        assert_eq!(
            prompt(ConfirmationKind::EmailCode, Some("example.com")),
            "Enter the code from your email (example.com): "
        );
        assert_eq!(
            prompt(ConfirmationKind::DeviceCode, None),
            "Enter the code from your authenticator app: "
        );
    }
}
