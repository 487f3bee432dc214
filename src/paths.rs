//! Injected base directories (§9 Design Notes: no globals).
//!
//! The core never calls `std::env::home_dir` or reads `process::cwd`
//! itself; every directory it writes to is resolved once, by the caller,
//! into a [`Paths`] record and threaded through every collaborator.

use std::path::{Path, PathBuf};

/// Resolved base directories for one deployment core instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Paths {
    /// `<home>/.taptik` (or an override root).
    root: PathBuf,
}

impl Paths {
    /// Construct from an explicit root directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Convenience constructor for the CLI (out of scope here): resolves
    /// `<home>/.taptik` via the `dirs` crate. Library code should prefer
    /// [`Paths::new`] with an explicitly supplied root.
    #[must_use]
    pub fn under_home() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(".taptik"))
    }

    /// The root directory itself.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/backups`.
    #[must_use]
    pub fn backups_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    /// `<root>/backups/<platform>/<backup_id>`.
    #[must_use]
    pub fn backup_dir(&self, platform: &str, backup_id: &str) -> PathBuf {
        self.backups_dir().join(platform).join(backup_id)
    }

    /// `<root>/logs`.
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// `<root>/audit`.
    #[must_use]
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// `<root>/reverse-conversion`.
    #[must_use]
    pub fn reverse_conversion_dir(&self) -> PathBuf {
        self.root.join("reverse-conversion")
    }

    /// `<root>/reports`.
    #[must_use]
    pub fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }

    /// Lock file path for an arbitrary protected path: `<file>.lock`.
    #[must_use]
    pub fn lock_path_for(&self, protected: &Path) -> PathBuf {
        let mut name = protected.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// The per-platform lock directory under the root, used for
    /// `cleanupStaleLocks`'s per-project scan.
    #[must_use]
    pub fn locks_dir(&self) -> PathBuf {
        self.root.join("locks")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_dir_nests_platform_and_id() {
        let paths = Paths::new("/home/u/.taptik");
        assert_eq!(paths.backup_dir("cursor", "abc123"), PathBuf::from("/home/u/.taptik/backups/cursor/abc123"));
    }

    #[test]
    fn lock_path_appends_suffix() {
        let paths = Paths::new("/home/u/.taptik");
        assert_eq!(paths.lock_path_for(Path::new("/x/settings.json")), PathBuf::from("/x/settings.json.lock"));
    }
}
