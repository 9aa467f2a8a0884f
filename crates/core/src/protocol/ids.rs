//! Identifier types: job ids and account ids.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Correlation token attached to an outbound request and echoed by its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

/// Process-wide job id sequence. Starts at 1; `u64::MAX` is reserved.
static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

impl JobId {
    /// Marker for packets that carry no job id.
    pub const NONE: JobId = JobId(u64::MAX);

    /// Allocate a fresh, process-unique job id.
    pub fn next() -> JobId {
        JobId(NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn is_none(self) -> bool {
        self == JobId::NONE
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// 64-bit account identifier assigned by the remote on logon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SteamId(pub u64);

impl SteamId {
    /// Numeric account id: the low 32 bits of the SteamId.
    pub fn account_id(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }
}

impl fmt::Display for SteamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_job_ids_are_unique() {
        let ids: HashSet<JobId> = (0..1000).map(|_| JobId::next()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(!ids.contains(&JobId::NONE));
    }

    #[test]
    fn test_job_ids_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..250).map(|_| JobId::next()).collect::<Vec<_>>()))
            .collect();
        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id), "duplicate job id {}", id);
            }
        }
    }

    #[test]
    fn test_account_id_is_low_word() {
        let id = SteamId(76561197960287930);
        assert_eq!(id.account_id(), 22202);
    }

    #[test]
    fn test_none_display() {
        assert_eq!(JobId::NONE.to_string(), "none");
        assert_eq!(JobId(7).to_string(), "7");
    }
}
