//! Ticket file persistence.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, warn};

use crate::config::TicketFilesConfig;
use crate::persist::{write_atomic, Staged};

use super::{RecordKind, TicketError};

/// Writes records to `<dir>/<prefix><app_id>`.
#[derive(Debug, Clone)]
pub struct TicketWriter {
    dir: PathBuf,
    files: TicketFilesConfig,
}

impl TicketWriter {
    pub fn new(dir: impl Into<PathBuf>, files: TicketFilesConfig) -> Self {
        Self {
            dir: dir.into(),
            files,
        }
    }

    /// Destination of the `kind` record for `app_id`.
    pub fn path_for(&self, kind: RecordKind, app_id: u32) -> PathBuf {
        let prefix = match kind {
            RecordKind::Ownership => &self.files.ownership_prefix,
            RecordKind::Encrypted => &self.files.encrypted_prefix,
        };
        self.dir.join(format!("{}{}", prefix, app_id))
    }

    fn check_len(kind: RecordKind, record: &[u8]) -> Result<(), TicketError> {
        if record.len() != kind.record_len() {
            return Err(TicketError::WrongLength {
                kind,
                expected: kind.record_len(),
                actual: record.len(),
            });
        }
        Ok(())
    }

    async fn ensure_dir(&self) -> Result<(), TicketError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| TicketError::WriteFailed {
                path: self.dir.clone(),
                source,
            })
    }

    /// Write one record. The file is replaced completely or left untouched.
    pub async fn write(
        &self,
        kind: RecordKind,
        app_id: u32,
        record: &[u8],
    ) -> Result<PathBuf, TicketError> {
        Self::check_len(kind, record)?;
        self.ensure_dir().await?;

        let path = self.path_for(kind, app_id);
        write_atomic(&path, record)
            .await
            .map_err(|source| TicketError::WriteFailed {
                path: path.clone(),
                source,
            })?;

        info!("Saved {} record ({} bytes) to {}", kind, record.len(), path.display());
        Ok(path)
    }

    /// Write both records for `app_id`.
    ///
    /// Lengths are checked before anything touches the disk, and both
    /// records are fully written to temporary files before either target is
    /// replaced. A failure while staging leaves any earlier pair intact.
    pub async fn write_pair(
        &self,
        app_id: u32,
        ownership: &[u8],
        encrypted: &[u8],
    ) -> Result<(PathBuf, PathBuf), TicketError> {
        Self::check_len(RecordKind::Ownership, ownership)?;
        Self::check_len(RecordKind::Encrypted, encrypted)?;
        self.ensure_dir().await?;

        let ownership_path = self.path_for(RecordKind::Ownership, app_id);
        let encrypted_path = self.path_for(RecordKind::Encrypted, app_id);
        let staged_ownership = Staged::write(&ownership_path, ownership)
            .await
            .map_err(|source| write_failed(&ownership_path, source))?;
        let staged_encrypted = match Staged::write(&encrypted_path, encrypted).await {
            Ok(staged) => staged,
            Err(source) => {
                staged_ownership.discard().await;
                return Err(write_failed(&encrypted_path, source));
            }
        };

        if let Err(source) = staged_ownership.commit().await {
            staged_encrypted.discard().await;
            return Err(write_failed(&ownership_path, source));
        }
        if let Err(source) = staged_encrypted.commit().await {
            warn!(
                "{} replaced but {} was not",
                ownership_path.display(),
                encrypted_path.display()
            );
            return Err(write_failed(&encrypted_path, source));
        }

        info!(
            "Saved ownership and encrypted records for app {} to {}",
            app_id,
            self.dir.display()
        );
        Ok((ownership_path, encrypted_path))
    }
}

fn write_failed(path: &Path, source: io::Error) -> TicketError {
    TicketError::WriteFailed {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::{ENCRYPTED_RECORD_LEN, OWNERSHIP_RECORD_LEN};
    use tempfile::TempDir;

    fn writer(dir: &TempDir) -> TicketWriter {
        TicketWriter::new(dir.path().join("Tickets"), TicketFilesConfig::default())
    }

    #[test]
    fn test_path_uses_prefix_and_app_id() {
        let writer = TicketWriter::new("/out", TicketFilesConfig::default());
        assert_eq!(
            writer.path_for(RecordKind::Ownership, 730),
            PathBuf::from("/out/ticket_730")
        );
        assert_eq!(
            writer.path_for(RecordKind::Encrypted, 730),
            PathBuf::from("/out/encryptedTicket_730")
        );
    }

    #[tokio::test]
    async fn test_write_creates_directory_and_file() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir);

        let path = writer
            .write(RecordKind::Ownership, 570, &[3; OWNERSHIP_RECORD_LEN])
            .await
            .unwrap();
        assert_eq!(std::fs::read(path).unwrap().len(), OWNERSHIP_RECORD_LEN);
    }

    #[tokio::test]
    async fn test_write_rejects_wrong_length() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir);

        let err = writer
            .write(RecordKind::Encrypted, 570, &[0; OWNERSHIP_RECORD_LEN])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TicketError::WrongLength {
                expected: ENCRYPTED_RECORD_LEN,
                ..
            }
        ));
        assert!(!writer.path_for(RecordKind::Encrypted, 570).exists());
    }

    #[tokio::test]
    async fn test_write_pair_checks_both_before_writing() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir);

        let result = writer
            .write_pair(730, &[1; OWNERSHIP_RECORD_LEN], &[2; 10])
            .await;
        assert!(result.is_err());
        assert!(!writer.path_for(RecordKind::Ownership, 730).exists());
        assert!(!writer.path_for(RecordKind::Encrypted, 730).exists());
    }

    #[tokio::test]
    async fn test_write_pair_writes_both() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir);

        let (ownership, encrypted) = writer
            .write_pair(730, &[1; OWNERSHIP_RECORD_LEN], &[2; ENCRYPTED_RECORD_LEN])
            .await
            .unwrap();
        assert_eq!(std::fs::read(ownership).unwrap(), vec![1; OWNERSHIP_RECORD_LEN]);
        assert_eq!(std::fs::read(encrypted).unwrap(), vec![2; ENCRYPTED_RECORD_LEN]);
    }

    #[tokio::test]
    async fn test_failed_pair_keeps_previous_pair() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir);
        writer
            .write_pair(730, &[1; OWNERSHIP_RECORD_LEN], &[2; ENCRYPTED_RECORD_LEN])
            .await
            .unwrap();

        // A directory squatting on the temp name makes the second stage fail.
        let encrypted_path = writer.path_for(RecordKind::Encrypted, 730);
        let blocker = encrypted_path.with_file_name("encryptedTicket_730.tmp");
        std::fs::create_dir(&blocker).unwrap();

        let result = writer
            .write_pair(730, &[7; OWNERSHIP_RECORD_LEN], &[8; ENCRYPTED_RECORD_LEN])
            .await;
        assert!(matches!(result, Err(TicketError::WriteFailed { .. })));

        assert_eq!(
            std::fs::read(writer.path_for(RecordKind::Ownership, 730)).unwrap(),
            vec![1; OWNERSHIP_RECORD_LEN]
        );
        assert_eq!(std::fs::read(&encrypted_path).unwrap(), vec![2; ENCRYPTED_RECORD_LEN]);
        assert!(!dir.path().join("Tickets").join("ticket_730.tmp").exists());
    }
}
