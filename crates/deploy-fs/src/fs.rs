//! The [`Filesystem`] trait — the single abstraction boundary between the
//! deployment core and the OS filesystem.
//!
//! No `deploy-core` module should call `std::fs` directly; instead it
//! depends on `deploy-fs` and programs against this trait. A
//! [`crate::fake::FakeFilesystem`] (behind the `test-support` feature)
//! implements the same trait entirely in memory.

use std::path::{Path, PathBuf};

use crate::error::FsError;

/// Modification time and size of a path, as returned by [`Filesystem::metadata`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileMetadata {
    /// Unix-millisecond last-modified timestamp.
    pub modified_millis: u64,
    /// File size in bytes.
    pub len: u64,
}

/// The filesystem abstraction used throughout the deployment core.
///
/// # Object safety
///
/// This trait is object-safe: every method takes `&self` and returns
/// `Result`. Callers may use `&dyn Filesystem` or `Box<dyn Filesystem>`.
pub trait Filesystem: Send + Sync {
    /// Read a file's full contents.
    ///
    /// Replaces: `std::fs::read`.
    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError>;

    /// Write `data` to `path` atomically: write to a temp file in the same
    /// directory, `sync_all`, then rename over the destination. Creates
    /// parent directories if necessary.
    ///
    /// Replaces: `std::fs::write` (hardened against partial-write crashes,
    /// mirroring the merge-state persistence pattern this crate is
    /// grounded on).
    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError>;

    /// Append `data` to `path`, creating it (and parent directories) if
    /// necessary. Used for append-only log files where atomic replace is
    /// unnecessary and would lose prior lines.
    ///
    /// Replaces: `OpenOptions::new().append(true).create(true)`.
    fn append(&self, path: &Path, data: &[u8]) -> Result<(), FsError>;

    /// Create a file at `path` only if it does not already exist, writing
    /// `data` in the same syscall. Returns [`FsError::AlreadyExists`] if the
    /// path is occupied.
    ///
    /// Replaces: `OpenOptions::new().write(true).create_new(true)`. This is
    /// the primitive the Lock Manager's `acquire` protocol depends on for
    /// atomicity.
    fn create_exclusive(&self, path: &Path, data: &[u8]) -> Result<(), FsError>;

    /// Whether a path exists (file or directory).
    ///
    /// Replaces: `std::path::Path::exists`.
    fn exists(&self, path: &Path) -> bool;

    /// Remove a file. Missing files are not an error (idempotent).
    ///
    /// Replaces: `std::fs::remove_file`.
    fn remove_file(&self, path: &Path) -> Result<(), FsError>;

    /// Copy `from` to `to`, creating parent directories of `to` if necessary.
    ///
    /// Replaces: `std::fs::copy`.
    fn copy(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Create a directory and all missing parent directories.
    ///
    /// Replaces: `std::fs::create_dir_all`.
    fn create_dir_all(&self, path: &Path) -> Result<(), FsError>;

    /// List the immediate children of a directory. Returns an empty list if
    /// the directory does not exist.
    ///
    /// Replaces: `std::fs::read_dir`.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, FsError>;

    /// Modification time and size of a path.
    ///
    /// Replaces: `std::fs::metadata`.
    fn metadata(&self, path: &Path) -> Result<FileMetadata, FsError>;
}
