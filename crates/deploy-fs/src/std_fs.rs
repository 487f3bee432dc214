//! [`StdFilesystem`]: the real, `std::fs`-backed [`crate::Filesystem`] impl.

use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::FsError;
use crate::fs::{FileMetadata, Filesystem};

/// A [`Filesystem`] backed by real OS calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFilesystem;

impl StdFilesystem {
    /// Construct a new instance. There is no state to configure; every
    /// instance behaves identically.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn ensure_parent(path: &Path) -> Result<(), FsError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| FsError::from_io(parent, e))?;
        }
    }
    Ok(())
}

impl Filesystem for StdFilesystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        fs::read(path).map_err(|e| FsError::from_io(path, e))
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        ensure_parent(path)?;
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| FsError::from_io(dir, e))?;
        temp.write_all(data).map_err(|e| FsError::from_io(path, e))?;
        temp.as_file().sync_all().map_err(|e| FsError::from_io(path, e))?;
        temp.persist(path).map_err(|e| FsError::from_io(path, e.error))?;
        Ok(())
    }

    fn append(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        ensure_parent(path)?;
        let mut file =
            OpenOptions::new().append(true).create(true).open(path).map_err(|e| FsError::from_io(path, e))?;
        file.write_all(data).map_err(|e| FsError::from_io(path, e))
    }

    fn create_exclusive(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        ensure_parent(path)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| FsError::from_io(path, e))?;
        file.write_all(data).map_err(|e| FsError::from_io(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FsError::from_io(path, e)),
        }
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        ensure_parent(to)?;
        fs::copy(from, to).map(|_| ()).map_err(|e| FsError::from_io(from, e))
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir_all(path).map_err(|e| FsError::from_io(path, e))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, FsError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| FsError::from_io(path, e))? {
            let entry = entry.map_err(|e| FsError::from_io(path, e))?;
            out.push(entry.path());
        }
        out.sort();
        Ok(out)
    }

    fn metadata(&self, path: &Path) -> Result<FileMetadata, FsError> {
        let meta = fs::metadata(path).map_err(|e| FsError::from_io(path, e))?;
        let modified_millis = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        Ok(FileMetadata { modified_millis, len: meta.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/file.txt");
        let fs = StdFilesystem::new();
        fs.write_atomic(&path, b"hello").unwrap();
        assert_eq!(fs.read(&path).unwrap(), b"hello");
    }

    #[test]
    fn create_exclusive_fails_on_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lock");
        let fs = StdFilesystem::new();
        fs.create_exclusive(&path, b"1").unwrap();
        assert!(matches!(fs.create_exclusive(&path, b"2"), Err(FsError::AlreadyExists(_))));
    }

    #[test]
    fn remove_file_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing");
        let fs = StdFilesystem::new();
        assert!(fs.remove_file(&path).is_ok());
    }

    #[test]
    fn append_accumulates_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        let fs = StdFilesystem::new();
        fs.append(&path, b"a\n").unwrap();
        fs.append(&path, b"b\n").unwrap();
        assert_eq!(fs.read(&path).unwrap(), b"a\nb\n");
    }

    #[test]
    fn read_dir_on_missing_directory_is_empty() {
        let fs = StdFilesystem::new();
        assert_eq!(fs.read_dir(Path::new("/does/not/exist/at/all")).unwrap(), Vec::<PathBuf>::new());
    }
}
