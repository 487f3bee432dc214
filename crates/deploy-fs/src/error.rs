//! The [`FsError`] enum returned by all [`crate::Filesystem`] methods.

use std::path::PathBuf;

/// An error from a [`crate::Filesystem`] operation.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The path did not exist where an operation required it to.
    #[error("not found: {0}")]
    NotFound(PathBuf),
    /// A create-exclusive call found the path already occupied.
    #[error("already exists: {0}")]
    AlreadyExists(PathBuf),
    /// The underlying OS call failed.
    #[error("io error at {path}: {source}")]
    Io {
        /// Path the failing operation targeted.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Wrap an [`std::io::Error`], mapping `NotFound` kinds to
    /// [`FsError::NotFound`] and `AlreadyExists` kinds to
    /// [`FsError::AlreadyExists`] so callers can match on those without
    /// inspecting the inner `io::Error`.
    #[must_use]
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists(path),
            _ => Self::Io { path, source },
        }
    }
}
