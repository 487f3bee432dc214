//! The Lock Manager (§4.2): file-advisory cross-process mutual exclusion
//! with stale-lock reaping.
//!
//! Grounded on the compare-and-swap discipline in the reference crate's
//! `refs.rs` (`write_ref_cas`, `RefError::CasMismatch`): acquisition is a
//! create-exclusive file write, and release is gated on an identity check
//! rather than a bare unlink, so a process can never release a lock it
//! does not own.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use deploy_fs::{FsError, Filesystem};
use deploy_model::lock::LockHandle;

use crate::clock::Clock;
use crate::error::DeploymentError;

/// How long to sleep between polls in [`LockManager::wait_for_lock`].
const POLL_INTERVAL_MILLIS: u64 = 50;

/// File-advisory lock acquisition, release, and stale-lock reaping.
pub struct LockManager {
    fs: Arc<dyn Filesystem>,
    clock: Arc<dyn Clock>,
    process_id: u32,
}

impl LockManager {
    /// Construct a manager for the current process.
    #[must_use]
    pub fn new(fs: Arc<dyn Filesystem>, clock: Arc<dyn Clock>, process_id: u32) -> Self {
        Self { fs, clock, process_id }
    }

    /// Acquire the lock at `path`, reaping one stale holder if found.
    ///
    /// # Errors
    /// Returns [`DeploymentError::LockUnavailable`] if the path is held by a
    /// live, non-stale process after one reap attempt.
    pub fn acquire(&self, path: &Path) -> Result<LockHandle, DeploymentError> {
        match self.try_create(path) {
            Ok(handle) => return Ok(handle),
            Err(FsError::AlreadyExists(_)) => {}
            Err(err) => return Err(err.into()),
        }

        let existing = self.read_handle(path)?;
        let alive = pid_is_alive(existing.process_id);
        if !existing.is_stale(self.clock.now_millis(), alive) {
            return Err(DeploymentError::LockUnavailable {
                path: path.to_path_buf(),
                reason: format!("already held by pid {}", existing.process_id),
            });
        }

        self.fs.remove_file(path)?;
        self.try_create(path).map_err(|err| match err {
            FsError::AlreadyExists(_) => DeploymentError::LockUnavailable {
                path: path.to_path_buf(),
                reason: "lost the race reaping a stale lock".to_owned(),
            },
            other => other.into(),
        })
    }

    fn try_create(&self, path: &Path) -> Result<LockHandle, FsError> {
        let handle = LockHandle::new(path.to_path_buf(), self.process_id, self.clock.now_millis());
        let bytes = serde_json::to_vec(&handle).unwrap_or_default();
        self.fs.create_exclusive(path, &bytes)?;
        Ok(handle)
    }

    fn read_handle(&self, path: &Path) -> Result<LockHandle, DeploymentError> {
        let bytes = self.fs.read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            DeploymentError::InternalInvariant { detail: format!("corrupt lock file at {}: {e}", path.display()) }
        })
    }

    /// Release `handle`. Verifies the on-disk record's id still matches;
    /// a mismatch means another process reaped and re-acquired the lock
    /// since `handle` was issued.
    ///
    /// # Errors
    /// Returns [`DeploymentError::LockUnavailable`] on id mismatch. A
    /// missing file is not an error — release is idempotent.
    pub fn release(&self, handle: &LockHandle) -> Result<(), DeploymentError> {
        if !self.fs.exists(&handle.file_path) {
            return Ok(());
        }
        let on_disk = self.read_handle(&handle.file_path)?;
        if on_disk.id != handle.id {
            return Err(DeploymentError::LockUnavailable {
                path: handle.file_path.clone(),
                reason: "ownership mismatch: lock was reaped and re-acquired".to_owned(),
            });
        }
        self.fs.remove_file(&handle.file_path).map_err(Into::into)
    }

    /// Whether `path` is currently held by a non-stale lock.
    #[must_use]
    pub fn is_locked(&self, path: &Path) -> bool {
        let Ok(handle) = self.read_handle(path) else { return false };
        !handle.is_stale(self.clock.now_millis(), pid_is_alive(handle.process_id))
    }

    /// Poll [`Self::acquire`] until it succeeds or `timeout_millis` elapses.
    /// Returns the handle on success; `None` on timeout (never panics or
    /// propagates a transient failure as fatal).
    pub fn wait_for_lock(&self, path: &Path, timeout_millis: u64) -> Option<LockHandle> {
        let deadline = self.clock.now_millis().saturating_add(timeout_millis);
        loop {
            if let Ok(handle) = self.acquire(path) {
                return Some(handle);
            }
            if self.clock.now_millis() >= deadline {
                return None;
            }
            std::thread::sleep(std::time::Duration::from_millis(POLL_INTERVAL_MILLIS));
        }
    }

    /// Release every lock file under `scope` that is owned by this
    /// process. Unconditional and idempotent (§4.8 step 1).
    ///
    /// # Errors
    /// Propagates directory-listing failures; individual unreadable lock
    /// files are skipped rather than aborting the sweep.
    pub fn release_all(&self, scope: &Path) -> Result<usize, DeploymentError> {
        let mut released = 0;
        for path in self.lock_files_in(scope)? {
            if let Ok(handle) = self.read_handle(&path) {
                if handle.process_id == self.process_id {
                    self.fs.remove_file(&path)?;
                    released += 1;
                }
            }
        }
        Ok(released)
    }

    /// Scan `scope` and unlink any lock file whose holder is stale.
    /// Returns the paths removed.
    ///
    /// # Errors
    /// Propagates directory-listing failures; individual unreadable lock
    /// files are skipped.
    pub fn cleanup_stale_locks(&self, scope: &Path) -> Result<Vec<PathBuf>, DeploymentError> {
        let mut removed = Vec::new();
        for path in self.lock_files_in(scope)? {
            if let Ok(handle) = self.read_handle(&path) {
                let alive = pid_is_alive(handle.process_id);
                if handle.is_stale(self.clock.now_millis(), alive) {
                    self.fs.remove_file(&path)?;
                    removed.push(path);
                }
            }
        }
        Ok(removed)
    }

    fn lock_files_in(&self, scope: &Path) -> Result<Vec<PathBuf>, DeploymentError> {
        Ok(self
            .fs
            .read_dir(scope)?
            .into_iter()
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("lock"))
            .collect())
    }
}

/// Whether a process with `pid` still exists.
///
/// On Linux this checks for `/proc/<pid>`. On any other platform (or if
/// the check itself fails for a reason other than "not found") it assumes
/// the process is alive — false positives merely delay stale-lock reaping
/// by up to the timestamp threshold, which is the safer failure mode than
/// reaping a live process's lock.
#[must_use]
pub fn pid_is_alive(pid: u32) -> bool {
    if cfg!(target_os = "linux") {
        Path::new(&format!("/proc/{pid}")).exists()
    } else {
        true
    }
}
