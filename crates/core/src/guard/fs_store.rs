//! File system guard store.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use crate::persist::write_atomic;

use super::store::{validate_username, GuardStore, GuardStoreError};

pub const GUARD_FILE_EXTENSION: &str = "sentry";

/// Stores each user's guard data as plain text in `<dir>/<username>.sentry`.
#[derive(Debug, Clone)]
pub struct FsGuardStore {
    dir: PathBuf,
}

impl FsGuardStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the guard file for `username`.
    pub fn path_for(&self, username: &str) -> Result<PathBuf, GuardStoreError> {
        validate_username(username)?;
        Ok(self
            .dir
            .join(format!("{}.{}", username, GUARD_FILE_EXTENSION)))
    }
}

#[async_trait]
impl GuardStore for FsGuardStore {
    async fn load(&self, username: &str) -> Result<Option<String>, GuardStoreError> {
        let path = self.path_for(username)?;
        match fs::read_to_string(&path).await {
            Ok(blob) => {
                debug!("Loaded guard data for {} from {}", username, path.display());
                Ok(Some(blob))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No guard data for {}", username);
                Ok(None)
            }
            Err(source) => Err(GuardStoreError::ReadFailed { path, source }),
        }
    }

    async fn store(&self, username: &str, blob: &str) -> Result<(), GuardStoreError> {
        let path = self.path_for(username)?;
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| GuardStoreError::WriteFailed {
                path: self.dir.clone(),
                source,
            })?;
        write_atomic(&path, blob.as_bytes())
            .await
            .map_err(|source| GuardStoreError::WriteFailed {
                path: path.clone(),
                source,
            })?;
        info!("Saved guard data for {} to {}", username, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = FsGuardStore::new(dir.path().join("Sentries"));
        assert_eq!(store.load("u").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = FsGuardStore::new(dir.path().join("Sentries"));

        store.store("u", "blob-one").await.unwrap();
        assert_eq!(store.load("u").await.unwrap().as_deref(), Some("blob-one"));

        let on_disk = std::fs::read_to_string(dir.path().join("Sentries").join("u.sentry")).unwrap();
        assert_eq!(on_disk, "blob-one");
    }

    #[tokio::test]
    async fn test_second_store_replaces_first() {
        let dir = TempDir::new().unwrap();
        let store = FsGuardStore::new(dir.path());

        store.store("u", "a much longer first blob").await.unwrap();
        store.store("u", "short").await.unwrap();
        assert_eq!(store.load("u").await.unwrap().as_deref(), Some("short"));
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let dir = TempDir::new().unwrap();
        let store = FsGuardStore::new(dir.path());

        store.store("alice", "a").await.unwrap();
        store.store("bob", "b").await.unwrap();
        assert_eq!(store.load("alice").await.unwrap().as_deref(), Some("a"));
        assert_eq!(store.load("bob").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FsGuardStore::new(dir.path());
        assert!(matches!(
            store.store("../escape", "x").await,
            Err(GuardStoreError::InvalidUsername(_))
        ));
        assert!(matches!(
            store.load("").await,
            Err(GuardStoreError::InvalidUsername(_))
        ));
    }
}
