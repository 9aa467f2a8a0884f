//! Remote result codes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric result code carried by remote responses.
///
/// Unknown values are preserved as-is so they can be reported verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultCode(pub u32);

impl ResultCode {
    pub const OK: ResultCode = ResultCode(1);
    pub const FAIL: ResultCode = ResultCode(2);
    pub const NO_CONNECTION: ResultCode = ResultCode(3);
    pub const INVALID_PASSWORD: ResultCode = ResultCode(5);
    pub const LOGGED_IN_ELSEWHERE: ResultCode = ResultCode(6);
    pub const INVALID_PARAM: ResultCode = ResultCode(8);
    pub const BUSY: ResultCode = ResultCode(10);
    pub const INVALID_STATE: ResultCode = ResultCode(11);
    pub const ACCESS_DENIED: ResultCode = ResultCode(15);
    pub const TIMEOUT: ResultCode = ResultCode(16);
    pub const SERVICE_UNAVAILABLE: ResultCode = ResultCode(20);
    pub const NOT_LOGGED_ON: ResultCode = ResultCode(21);
    pub const RATE_LIMIT_EXCEEDED: ResultCode = ResultCode(84);
    pub const ACCOUNT_LOGON_DENIED: ResultCode = ResultCode(63);
    pub const INVALID_LOGIN_AUTH_CODE: ResultCode = ResultCode(65);
    pub const EXPIRED: ResultCode = ResultCode(27);
    pub const TWO_FACTOR_CODE_MISMATCH: ResultCode = ResultCode(88);

    /// Whether this code signals success.
    pub fn is_ok(self) -> bool {
        self == ResultCode::OK
    }

    /// Symbolic name, if the code is one of the well-known values.
    pub fn name(self) -> Option<&'static str> {
        let name = match self.0 {
            1 => "OK",
            2 => "Fail",
            3 => "NoConnection",
            5 => "InvalidPassword",
            6 => "LoggedInElsewhere",
            8 => "InvalidParam",
            10 => "Busy",
            11 => "InvalidState",
            15 => "AccessDenied",
            16 => "Timeout",
            20 => "ServiceUnavailable",
            21 => "NotLoggedOn",
            27 => "Expired",
            63 => "AccountLogonDenied",
            65 => "InvalidLoginAuthCode",
            84 => "RateLimitExceeded",
            88 => "TwoFactorCodeMismatch",
            _ => return None,
        };
        Some(name)
    }
}

impl Default for ResultCode {
    fn default() -> Self {
        ResultCode::FAIL
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "result {}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok() {
        assert!(ResultCode::OK.is_ok());
        assert!(!ResultCode::FAIL.is_ok());
        assert!(!ResultCode(0).is_ok());
    }

    #[test]
    fn test_display_known_and_unknown() {
        assert_eq!(ResultCode::ACCESS_DENIED.to_string(), "AccessDenied (15)");
        assert_eq!(ResultCode(4242).to_string(), "result 4242");
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&ResultCode::INVALID_PASSWORD).unwrap();
        assert_eq!(json, "5");
        let parsed: ResultCode = serde_json::from_str("84").unwrap();
        assert_eq!(parsed, ResultCode::RATE_LIMIT_EXCEEDED);
    }
}
