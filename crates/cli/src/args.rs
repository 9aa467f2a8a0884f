//! CLI argument parsing.

use clap::Parser;
use std::path::PathBuf;

/// Log in and save the ownership and encrypted tickets for one application.
#[derive(Parser, Debug)]
#[command(name = "ticket-grabber", version, about)]
pub struct Args {
    /// Account name
    pub username: String,

    /// Account password
    pub password: String,

    /// Numeric application id
    pub app_id: u32,

    /// Configuration file (TOML)
    #[arg(long, value_name = "PATH", env = "TICKETGRAB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Email or authenticator code, if the login asks for one
    #[arg(long, value_name = "CODE")]
    pub guard_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse_args(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(args)
    }

    #[test]
    fn test_positional_args() {
        let args = parse_args(&["ticket-grabber", "u", "p", "730"]).unwrap();
        assert_eq!(args.username, "u");
        assert_eq!(args.password, "p");
        assert_eq!(args.app_id, 730);
        assert!(args.guard_code.is_none());
    }

    #[test]
    fn test_optional_flags() {
        let args = parse_args(&[
            "ticket-grabber",
            "--config",
            "/etc/ticketgrab.toml",
            "--guard-code",
            "F00D5",
            "u",
            "p",
            "570",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/etc/ticketgrab.toml")));
        assert_eq!(args.guard_code.as_deref(), Some("F00D5"));
        assert_eq!(args.app_id, 570);
    }

    #[test]
    fn test_non_numeric_app_id_rejected() {
        let err = parse_args(&["ticket-grabber", "u", "p", "abc"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_missing_args_rejected() {
        let err = parse_args(&["ticket-grabber", "u"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_help_is_an_error_kind() {
        let err = parse_args(&["ticket-grabber", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }
}
