use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server address is set and has a port
/// - Timeouts and intervals are not 0
/// - Ticket prefixes are non-empty and contain no path separators
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let server = config.connection.server.trim();
    if server.is_empty() {
        return Err(ConfigError::ValidationError(
            "connection.server cannot be empty".to_string(),
        ));
    }
    if !server.rsplit_once(':').is_some_and(|(_, port)| port.parse::<u16>().is_ok()) {
        return Err(ConfigError::ValidationError(format!(
            "connection.server must be host:port, got {:?}",
            server
        )));
    }

    let session = &config.session;
    for (name, value) in [
        ("connection.connect_timeout_secs", config.connection.connect_timeout_secs),
        ("session.poll_wait_ms", session.poll_wait_ms),
        ("session.job_timeout_secs", session.job_timeout_secs),
        ("session.auth_timeout_secs", session.auth_timeout_secs),
        ("session.auth_poll_interval_ms", session.auth_poll_interval_ms),
    ] {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!("{} cannot be 0", name)));
        }
    }

    for (name, prefix) in [
        ("tickets.ownership_prefix", &config.tickets.ownership_prefix),
        ("tickets.encrypted_prefix", &config.tickets.encrypted_prefix),
    ] {
        if prefix.is_empty() {
            return Err(ConfigError::ValidationError(format!("{} cannot be empty", name)));
        }
        if prefix.contains(['/', '\\']) {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot contain path separators",
                name
            )));
        }
    }

    if config.tickets.ownership_prefix == config.tickets.encrypted_prefix {
        return Err(ConfigError::ValidationError(
            "ticket prefixes must differ".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_poll_wait_fails() {
        let mut config = Config::default();
        config.session.poll_wait_ms = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref m) if m.contains("poll_wait_ms")));
    }

    #[test]
    fn test_validate_server_without_port_fails() {
        let mut config = Config::default();
        config.connection.server = "localhost".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_prefix_fails() {
        let mut config = Config::default();
        config.tickets.encrypted_prefix = String::new();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_prefix_with_separator_fails() {
        let mut config = Config::default();
        config.tickets.ownership_prefix = "../ticket_".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_identical_prefixes_fails() {
        let mut config = Config::default();
        config.tickets.encrypted_prefix = config.tickets.ownership_prefix.clone();
        assert!(validate_config(&config).is_err());
    }
}
