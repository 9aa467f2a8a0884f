use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuardStoreError {
    /// Username cannot be used as a file key.
    #[error("Invalid username {0:?}")]
    InvalidUsername(String),

    #[error("Failed to read guard data from {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write guard data to {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Guard data keyed by username.
#[async_trait]
pub trait GuardStore: Send + Sync {
    /// Load the blob stored for `username`, `None` if there is none.
    async fn load(&self, username: &str) -> Result<Option<String>, GuardStoreError>;

    /// Replace the blob stored for `username`.
    async fn store(&self, username: &str, blob: &str) -> Result<(), GuardStoreError>;
}

/// Reject usernames that are empty or could escape the store directory.
pub fn validate_username(username: &str) -> Result<(), GuardStoreError> {
    let bad = username.is_empty()
        || username == "."
        || username.contains("..")
        || username.contains(['/', '\\', '\0']);
    if bad {
        return Err(GuardStoreError::InvalidUsername(username.to_string()));
    }
    Ok(())
}
