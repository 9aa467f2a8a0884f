//! Whole-file writes that never leave a partial file behind.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

/// A fully written temporary file waiting to replace its target.
#[derive(Debug)]
pub(crate) struct Staged {
    tmp: PathBuf,
    target: PathBuf,
}

impl Staged {
    /// Write and sync `bytes` to a sibling of `path` without touching `path`.
    pub(crate) async fn write(path: &Path, bytes: &[u8]) -> io::Result<Self> {
        let file_name = path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);

        let result: io::Result<()> = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.sync_all().await
        }
        .await;

        match result {
            Ok(()) => Ok(Self {
                tmp,
                target: path.to_path_buf(),
            }),
            Err(e) => {
                let _ = fs::remove_file(&tmp).await;
                Err(e)
            }
        }
    }

    /// Rename the temporary file over the target.
    pub(crate) async fn commit(self) -> io::Result<()> {
        let result = fs::rename(&self.tmp, &self.target).await;
        if result.is_err() {
            self.discard().await;
        }
        result
    }

    /// Remove the temporary file, leaving the target as it was.
    pub(crate) async fn discard(self) {
        let _ = fs::remove_file(&self.tmp).await;
    }
}

/// Write `bytes` to `path` via a sibling temporary file and a rename.
///
/// Readers see either the previous content or all of `bytes`.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    Staged::write(path, bytes).await?.commit().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_atomic_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blob");

        write_atomic(&path, b"first version").await.unwrap();
        write_atomic(&path, b"second").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert!(!dir.path().join("blob.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_atomic_missing_dir_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("blob");
        assert!(write_atomic(&path, b"x").await.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_discarded_stage_leaves_target_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blob");
        write_atomic(&path, b"kept").await.unwrap();

        let staged = Staged::write(&path, b"dropped").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"kept");
        staged.discard().await;

        assert_eq!(std::fs::read(&path).unwrap(), b"kept");
        assert!(!dir.path().join("blob.tmp").exists());
    }
}
