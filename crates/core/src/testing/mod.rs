//! Testing utilities: in-process transports standing in for the remote.
//!
//! `RecordingTransport` records what was sent and replays whatever inbound
//! packets a test queues. `MockRemote` plays the remote's side of the whole
//! login and ticket exchange from a `RemoteScript`.
//!
//! # Example
//!
//! ```rust,ignore
//! use ticketgrab_core::testing::{MockRemote, RemoteScript};
//!
//! let remote = Arc::new(MockRemote::new(RemoteScript {
//!     logon_result: ResultCode::ACCESS_DENIED,
//!     ..Default::default()
//! }));
//! let session = Session::new(remote.clone(), Duration::from_millis(10));
//! ```

mod inbox;
mod mock_remote;
mod recording;

pub use mock_remote::{MockRemote, RemoteScript, MOCK_CLIENT_ID, MOCK_STEAM_ID};
pub use recording::RecordingTransport;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::config::{Config, PathsConfig, SessionConfig};

    /// Configuration with short timings and both directories under `base`.
    pub fn test_config(base: &Path) -> Config {
        Config {
            session: SessionConfig {
                poll_wait_ms: 10,
                job_timeout_secs: 2,
                auth_timeout_secs: 5,
                auth_poll_interval_ms: 10,
                ..Default::default()
            },
            paths: PathsConfig {
                guard_data_dir: base.join("Sentries"),
                ticket_dir: base.join("Tickets"),
            },
            ..Default::default()
        }
    }
}
