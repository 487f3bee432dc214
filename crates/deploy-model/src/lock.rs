//! Pure data shape for the Lock Manager (§4.2).
//!
//! Acquisition, reaping, and the on-disk protocol live in
//! `deploy-core::lock`; this is just the serialized record.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ids::Id;

/// A lock beyond its staleness threshold (1 hour).
pub const STALE_THRESHOLD_MILLIS: u64 = 60 * 60 * 1000;

/// The serialized content of a lock file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockHandle {
    /// Lock identity; must match on release.
    pub id: Id,
    /// Path to the lock file on disk.
    pub file_path: PathBuf,
    /// PID of the process that acquired the lock.
    pub process_id: u32,
    /// Unix-millisecond acquisition timestamp.
    pub timestamp: u64,
}

impl LockHandle {
    /// Construct a new handle for the current process.
    #[must_use]
    pub fn new(file_path: PathBuf, process_id: u32, timestamp: u64) -> Self {
        Self { id: Id::generate(), file_path, process_id, timestamp }
    }

    /// Whether this handle is stale as of `now`, given `pid_alive`'s verdict
    /// on whether [`Self::process_id`] still exists.
    #[must_use]
    pub fn is_stale(&self, now: u64, pid_alive: bool) -> bool {
        !pid_alive || now.saturating_sub(self.timestamp) > STALE_THRESHOLD_MILLIS
    }
}
