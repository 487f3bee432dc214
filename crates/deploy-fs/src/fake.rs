//! [`FakeFilesystem`]: an in-memory [`crate::Filesystem`] for tests.
//!
//! Available behind the `test-support` feature, the same convention
//! `deploy-core` uses to expose its own fakes across crate boundaries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::FsError;
use crate::fs::{FileMetadata, Filesystem};

#[derive(Default)]
struct State {
    files: BTreeMap<PathBuf, Vec<u8>>,
    modified_millis: BTreeMap<PathBuf, u64>,
    clock: u64,
}

/// An in-memory filesystem double. Directories are implicit: a path
/// "exists" as a directory if some stored file has it as an ancestor.
pub struct FakeFilesystem {
    state: Mutex<State>,
}

impl Default for FakeFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeFilesystem {
    /// Construct an empty fake filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self { state: Mutex::new(State::default()) }
    }

    /// Seed a file's contents directly, bypassing the [`Filesystem`] trait.
    pub fn seed(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
        let mut state = self.state.lock();
        let tick = next_tick(&mut state);
        let path = path.into();
        state.files.insert(path.clone(), data.into());
        state.modified_millis.insert(path, tick);
    }

    /// Override a path's recorded modification time, for retention-sweep tests.
    pub fn set_modified(&self, path: impl Into<PathBuf>, millis: u64) {
        self.state.lock().modified_millis.insert(path.into(), millis);
    }
}

fn next_tick(state: &mut State) -> u64 {
    state.clock += 1;
    state.clock
}

impl Filesystem for FakeFilesystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        self.state.lock().files.get(path).cloned().ok_or_else(|| FsError::NotFound(path.to_path_buf()))
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        let mut state = self.state.lock();
        let tick = next_tick(&mut state);
        state.files.insert(path.to_path_buf(), data.to_vec());
        state.modified_millis.insert(path.to_path_buf(), tick);
        Ok(())
    }

    fn append(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        let mut state = self.state.lock();
        let tick = next_tick(&mut state);
        state.files.entry(path.to_path_buf()).or_default().extend_from_slice(data);
        state.modified_millis.insert(path.to_path_buf(), tick);
        Ok(())
    }

    fn create_exclusive(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        let mut state = self.state.lock();
        if state.files.contains_key(path) {
            return Err(FsError::AlreadyExists(path.to_path_buf()));
        }
        let tick = next_tick(&mut state);
        state.files.insert(path.to_path_buf(), data.to_vec());
        state.modified_millis.insert(path.to_path_buf(), tick);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.state.lock();
        state.files.contains_key(path) || state.files.keys().any(|p| p.starts_with(path) && p != path)
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        let mut state = self.state.lock();
        state.files.remove(path);
        state.modified_millis.remove(path);
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let mut state = self.state.lock();
        let data = state.files.get(from).cloned().ok_or_else(|| FsError::NotFound(from.to_path_buf()))?;
        let tick = next_tick(&mut state);
        state.files.insert(to.to_path_buf(), data);
        state.modified_millis.insert(to.to_path_buf(), tick);
        Ok(())
    }

    fn create_dir_all(&self, _path: &Path) -> Result<(), FsError> {
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, FsError> {
        let state = self.state.lock();
        let mut children: Vec<PathBuf> = state
            .files
            .keys()
            .filter_map(|p| {
                let rest = p.strip_prefix(path).ok()?;
                let mut components = rest.components();
                let first = components.next()?;
                Some(path.join(first))
            })
            .collect();
        children.sort();
        children.dedup();
        Ok(children)
    }

    fn metadata(&self, path: &Path) -> Result<FileMetadata, FsError> {
        let state = self.state.lock();
        let data = state.files.get(path).ok_or_else(|| FsError::NotFound(path.to_path_buf()))?;
        let modified_millis = state.modified_millis.get(path).copied().unwrap_or(0);
        Ok(FileMetadata { modified_millis, len: data.len() as u64 })
    }
}
