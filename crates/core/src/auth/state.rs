//! Login flow states.

use std::fmt;

use tracing::{info, warn};

/// Where the login flow is. States only move forward, and `Done` and
/// `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuthState {
    Disconnected,
    Connected,
    CredentialAuthPending,
    GuardPolling,
    LoggingOn,
    Online,
    TicketsRequested,
    Done,
    Failed,
}

impl AuthState {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthState::Disconnected => "disconnected",
            AuthState::Connected => "connected",
            AuthState::CredentialAuthPending => "credential_auth_pending",
            AuthState::GuardPolling => "guard_polling",
            AuthState::LoggingOn => "logging_on",
            AuthState::Online => "online",
            AuthState::TicketsRequested => "tickets_requested",
            AuthState::Done => "done",
            AuthState::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AuthState::Done | AuthState::Failed)
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_advance_to(self, next: AuthState) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == AuthState::Failed || next > self
    }

    /// Move to `next`, logging the transition. Backward moves and moves out
    /// of a terminal state are refused and return false.
    pub fn advance(&mut self, next: AuthState) -> bool {
        if !self.can_advance_to(next) {
            warn!("Refusing auth state transition {} -> {}", self, next);
            return false;
        }
        info!("Auth state {} -> {}", self, next);
        *self = next;
        true
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        let mut state = AuthState::Disconnected;
        for next in [
            AuthState::Connected,
            AuthState::CredentialAuthPending,
            AuthState::GuardPolling,
            AuthState::LoggingOn,
            AuthState::Online,
            AuthState::TicketsRequested,
            AuthState::Done,
        ] {
            assert!(state.advance(next));
            assert_eq!(state, next);
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn test_backward_transition_refused() {
        let mut state = AuthState::Online;
        assert!(!state.advance(AuthState::Connected));
        assert!(!state.advance(AuthState::Online));
        assert_eq!(state, AuthState::Online);
    }

    #[test]
    fn test_failed_reachable_from_any_live_state() {
        for start in [
            AuthState::Disconnected,
            AuthState::GuardPolling,
            AuthState::TicketsRequested,
        ] {
            let mut state = start;
            assert!(state.advance(AuthState::Failed));
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut done = AuthState::Done;
        assert!(!done.advance(AuthState::Failed));
        let mut failed = AuthState::Failed;
        assert!(!failed.advance(AuthState::Done));
        assert_eq!(failed, AuthState::Failed);
    }
}
