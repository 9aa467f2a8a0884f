use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub tickets: TicketFilesConfig,
}

/// Remote endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionConfig {
    /// Server address as `host:port`
    #[serde(default = "default_server")]
    pub server: String,
    /// Connect timeout in seconds (default: 10)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_server() -> String {
    "127.0.0.1:27017".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

/// Session and login flow timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Longest single wait of the pump loop for inbound packets (milliseconds).
    #[serde(default = "default_poll_wait")]
    pub poll_wait_ms: u64,

    /// Deadline for each correlated request and for awaited
    /// notifications such as the logon response (seconds).
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,

    /// Total time allowed for the credential auth session to complete,
    /// including guard confirmation (seconds).
    #[serde(default = "default_auth_timeout")]
    pub auth_timeout_secs: u64,

    /// Auth poll interval used when the remote does not suggest one
    /// (milliseconds).
    #[serde(default = "default_auth_poll_interval")]
    pub auth_poll_interval_ms: u64,

    /// Ask the remote for a persistent (remembered) session.
    #[serde(default = "default_true")]
    pub persistent_session: bool,

    /// Device name reported when starting the auth session.
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

impl SessionConfig {
    pub fn poll_wait(&self) -> Duration {
        Duration::from_millis(self.poll_wait_ms)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    pub fn auth_poll_interval(&self) -> Duration {
        Duration::from_millis(self.auth_poll_interval_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_wait_ms: default_poll_wait(),
            job_timeout_secs: default_job_timeout(),
            auth_timeout_secs: default_auth_timeout(),
            auth_poll_interval_ms: default_auth_poll_interval(),
            persistent_session: true,
            device_name: default_device_name(),
        }
    }
}

fn default_poll_wait() -> u64 {
    1000 // 1 second
}

fn default_job_timeout() -> u64 {
    30
}

fn default_auth_timeout() -> u64 {
    300 // 5 minutes, enough to approve on a phone
}

fn default_auth_poll_interval() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_device_name() -> String {
    "ticket-grabber".to_string()
}

/// Output directories
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Directory holding one guard-data file per username.
    #[serde(default = "default_guard_data_dir")]
    pub guard_data_dir: PathBuf,
    /// Directory receiving the ticket records.
    #[serde(default = "default_ticket_dir")]
    pub ticket_dir: PathBuf,
}

impl PathsConfig {
    /// Resolve relative directories against `base`.
    pub fn resolved_against(&self, base: &Path) -> Self {
        let resolve = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };
        Self {
            guard_data_dir: resolve(&self.guard_data_dir),
            ticket_dir: resolve(&self.ticket_dir),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            guard_data_dir: default_guard_data_dir(),
            ticket_dir: default_ticket_dir(),
        }
    }
}

fn default_guard_data_dir() -> PathBuf {
    PathBuf::from("Sentries")
}

fn default_ticket_dir() -> PathBuf {
    PathBuf::from("Tickets")
}

/// Ticket file naming
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TicketFilesConfig {
    /// Filename prefix of the ownership record.
    #[serde(default = "default_ownership_prefix")]
    pub ownership_prefix: String,
    /// Filename prefix of the encrypted record.
    #[serde(default = "default_encrypted_prefix")]
    pub encrypted_prefix: String,
}

impl Default for TicketFilesConfig {
    fn default() -> Self {
        Self {
            ownership_prefix: default_ownership_prefix(),
            encrypted_prefix: default_encrypted_prefix(),
        }
    }
}

fn default_ownership_prefix() -> String {
    "ticket_".to_string()
}

fn default_encrypted_prefix() -> String {
    "encryptedTicket_".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.connection.server, "127.0.0.1:27017");
        assert_eq!(config.connection.connect_timeout_secs, 10);
        assert_eq!(config.session.poll_wait_ms, 1000);
        assert_eq!(config.session.job_timeout_secs, 30);
        assert!(config.session.persistent_session);
        assert_eq!(config.paths.guard_data_dir, PathBuf::from("Sentries"));
        assert_eq!(config.paths.ticket_dir, PathBuf::from("Tickets"));
        assert_eq!(config.tickets.ownership_prefix, "ticket_");
        assert_eq!(config.tickets.encrypted_prefix, "encryptedTicket_");
    }

    #[test]
    fn test_deserialize_partial_sections() {
        let toml = r#"
[connection]
server = "cm.example.net:27017"

[session]
job_timeout_secs = 5
device_name = "bench"

[tickets]
ownership_prefix = "own_"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.connection.server, "cm.example.net:27017");
        assert_eq!(config.connection.connect_timeout_secs, 10);
        assert_eq!(config.session.job_timeout(), Duration::from_secs(5));
        assert_eq!(config.session.device_name, "bench");
        assert_eq!(config.session.poll_wait(), Duration::from_secs(1));
        assert_eq!(config.tickets.ownership_prefix, "own_");
        assert_eq!(config.tickets.encrypted_prefix, "encryptedTicket_");
    }

    #[test]
    fn test_paths_resolved_against_base() {
        let paths = PathsConfig {
            guard_data_dir: PathBuf::from("Sentries"),
            ticket_dir: PathBuf::from("/var/tickets"),
        };
        let resolved = paths.resolved_against(Path::new("/home/user"));
        assert_eq!(resolved.guard_data_dir, PathBuf::from("/home/user/Sentries"));
        assert_eq!(resolved.ticket_dir, PathBuf::from("/var/tickets"));
    }

    #[test]
    fn test_wrong_type_fails() {
        let toml = r#"
[session]
poll_wait_ms = "soon"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }
}
