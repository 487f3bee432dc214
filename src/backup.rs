//! The Backup Store (§4.3): timestamped file copies plus a manifest index,
//! dependency-ordered restore, and retention sweeps.
//!
//! Naming and layout intentionally preserve the source system's coupling
//! between backup and manifest filenames (§9 Design Notes): `rollback`
//! derives a manifest path from a backup path by substituting the
//! `backup_` prefix for `manifest_`, so every backup this store writes
//! uses exactly the prescribed `backup_YYYYMMDD_HHMMSS.<ext>` /
//! `manifest_YYYYMMDD_HHMMSS.json` pair.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use deploy_fs::Filesystem;
use deploy_model::backup::{BackupManifest, ComponentBackupEntry};
use deploy_model::ids::{ComponentName, Platform};

use crate::clock::Clock;
use crate::error::DeploymentError;
use crate::paths::Paths;

/// Timestamped backup copies, manifest persistence, and restore.
pub struct BackupStore {
    fs: Arc<dyn Filesystem>,
    clock: Arc<dyn Clock>,
    paths: Paths,
}

/// Format a Unix-millisecond timestamp as `YYYYMMDD_HHMMSS`, UTC, without a
/// calendar dependency (the teacher's ambient stack has none; this crate
/// doesn't add one just for filename formatting).
#[must_use]
pub fn format_backup_timestamp(millis: u64) -> String {
    let total_seconds = millis / 1000;
    let days = total_seconds / 86_400;
    let secs_of_day = total_seconds % 86_400;
    let (year, month, day) = civil_from_days(days as i64);
    let hour = secs_of_day / 3600;
    let minute = (secs_of_day % 3600) / 60;
    let second = secs_of_day % 60;
    format!("{year:04}{month:02}{day:02}_{hour:02}{minute:02}{second:02}")
}

/// Format a day count since the Unix epoch as `YYYY-MM-DD`, used for the
/// date-suffixed log file names in [`crate::audit`].
#[must_use]
pub fn civil_from_days_str(days: u64) -> String {
    let (year, month, day) = civil_from_days(days as i64);
    format!("{year:04}-{month:02}-{day:02}")
}

/// Howard Hinnant's days-from-civil algorithm, inverted: civil date from a
/// day count since the Unix epoch (1970-01-01).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let year = if month <= 2 { y + 1 } else { y };
    (year, month, day)
}

impl BackupStore {
    /// Construct a store rooted at `paths`.
    #[must_use]
    pub fn new(fs: Arc<dyn Filesystem>, clock: Arc<dyn Clock>, paths: Paths) -> Self {
        Self { fs, clock, paths }
    }

    /// Copy `path`'s current content aside, returning the backup path.
    /// No-op (returns `None`) if `path` does not exist yet.
    ///
    /// # Errors
    /// Returns [`DeploymentError::BackupWriteFailed`] if the copy fails.
    pub fn create_backup(&self, path: &Path) -> Result<Option<PathBuf>, DeploymentError> {
        if !self.fs.exists(path) {
            return Ok(None);
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("bak");
        let stamp = format_backup_timestamp(self.clock.now_millis());
        let backup_path = self.paths.backups_dir().join(format!("backup_{stamp}.{ext}"));
        self.fs.copy(path, &backup_path).map_err(|e| DeploymentError::BackupWriteFailed {
            path: backup_path.clone(),
            detail: e.to_string(),
        })?;

        let manifest_path = manifest_path_for(&backup_path);
        let single = serde_json::json!({ "originalPath": path, "backupPath": backup_path });
        self.fs
            .write_atomic(&manifest_path, &serde_json::to_vec_pretty(&single).unwrap_or_default())
            .map_err(|e| DeploymentError::BackupWriteFailed { path: manifest_path, detail: e.to_string() })?;

        Ok(Some(backup_path))
    }

    /// Persist a composite manifest for a multi-file deployment.
    ///
    /// # Errors
    /// Returns [`DeploymentError::BackupWriteFailed`] if the write fails.
    pub fn write_manifest(&self, manifest: &BackupManifest) -> Result<PathBuf, DeploymentError> {
        let stamp = format_backup_timestamp(manifest.timestamp);
        let path = self.paths.backup_dir(&manifest.platform.to_string(), manifest.id.as_str()).join("manifest.json");
        let bytes = serde_json::to_vec_pretty(manifest).unwrap_or_default();
        self.fs
            .write_atomic(&path, &bytes)
            .map_err(|e| DeploymentError::BackupWriteFailed { path: path.clone(), detail: e.to_string() })?;
        let _ = stamp; // composite manifests are addressed by backup id, not timestamp
        Ok(path)
    }

    /// Restore a single backup file verbatim to its recorded original path.
    ///
    /// # Errors
    /// Returns [`DeploymentError::BackupReadFailed`] or
    /// [`DeploymentError::WriteFailed`] on failure.
    pub fn rollback(&self, backup_path: &Path) -> Result<PathBuf, DeploymentError> {
        let manifest_path = manifest_path_for(backup_path);
        let bytes = self
            .fs
            .read(&manifest_path)
            .map_err(|e| DeploymentError::BackupReadFailed { path: manifest_path.clone(), detail: e.to_string() })?;
        let single: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
            DeploymentError::ManifestParseFailed { path: manifest_path.clone(), detail: e.to_string() }
        })?;
        let original_path: PathBuf = single
            .get("originalPath")
            .and_then(|v| v.as_str())
            .map(PathBuf::from)
            .ok_or_else(|| DeploymentError::ManifestParseFailed {
                path: manifest_path,
                detail: "missing originalPath".to_owned(),
            })?;

        let data = self
            .fs
            .read(backup_path)
            .map_err(|e| DeploymentError::BackupReadFailed { path: backup_path.to_path_buf(), detail: e.to_string() })?;
        self.fs
            .write_atomic(&original_path, &data)
            .map_err(|e| DeploymentError::WriteFailed { path: original_path.clone(), detail: e.to_string() })?;
        Ok(original_path)
    }

    /// Restore a single component from a composite manifest.
    ///
    /// # Errors
    /// Returns [`DeploymentError::ManifestParseFailed`],
    /// [`DeploymentError::ComponentNotInManifest`], or
    /// [`DeploymentError::WriteFailed`].
    pub fn rollback_component(&self, manifest_path: &Path, component: &ComponentName) -> Result<PathBuf, DeploymentError> {
        let manifest = self.read_manifest(manifest_path)?;
        self.restore_one(&manifest, component)
    }

    fn restore_one(&self, manifest: &BackupManifest, component: &ComponentName) -> Result<PathBuf, DeploymentError> {
        let entry = manifest
            .components
            .get(component)
            .ok_or_else(|| DeploymentError::ComponentNotInManifest { component: component.clone() })?;
        let data = self.fs.read(&entry.backup_path).map_err(|e| DeploymentError::BackupReadFailed {
            path: entry.backup_path.clone(),
            detail: e.to_string(),
        })?;
        self.fs.write_atomic(&entry.original_path, &data).map_err(|e| DeploymentError::WriteFailed {
            path: entry.original_path.clone(),
            detail: e.to_string(),
        })?;
        Ok(entry.original_path.clone())
    }

    /// Restore `component` and every dependency it declares, depth-first,
    /// each visited at most once even under cycles (§8 Invariant 3).
    ///
    /// # Errors
    /// Propagates the first per-component restore failure; components
    /// already restored before the failure are not rolled forward again.
    pub fn rollback_with_dependencies(
        &self,
        manifest_path: &Path,
        component: &ComponentName,
    ) -> Result<Vec<ComponentName>, DeploymentError> {
        let manifest = self.read_manifest(manifest_path)?;
        let order = manifest.restore_order(component);
        let mut restored = Vec::with_capacity(order.len());
        for name in order {
            self.restore_one(&manifest, &name)?;
            restored.push(name);
        }
        Ok(restored)
    }

    fn read_manifest(&self, path: &Path) -> Result<BackupManifest, DeploymentError> {
        self.get_backup_manifest(path)
    }

    /// Parse a composite manifest file.
    ///
    /// # Errors
    /// Returns [`DeploymentError::BackupReadFailed`] or
    /// [`DeploymentError::ManifestParseFailed`].
    pub fn get_backup_manifest(&self, path: &Path) -> Result<BackupManifest, DeploymentError> {
        let bytes = self
            .fs
            .read(path)
            .map_err(|e| DeploymentError::BackupReadFailed { path: path.to_path_buf(), detail: e.to_string() })?;
        serde_json::from_slice(&bytes)
            .map_err(|e| DeploymentError::ManifestParseFailed { path: path.to_path_buf(), detail: e.to_string() })
    }

    /// List every backup file path under the backup directory.
    ///
    /// # Errors
    /// Propagates directory-listing failures.
    pub fn list_backups(&self) -> Result<Vec<PathBuf>, DeploymentError> {
        Ok(self
            .fs
            .read_dir(&self.paths.backups_dir())?
            .into_iter()
            .filter(|p| p.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with("backup_")))
            .collect())
    }

    /// Unlink backups whose mtime is strictly older than `days * 86_400s`
    /// (§8 Invariant 2). Stats each backup independently and in parallel;
    /// a failure on one file is logged and does not abort the sweep (§9
    /// Design Notes — intentionally preserving the source's
    /// swallow-per-file-failure semantics).
    pub fn cleanup_old_backups(&self, days: u32) -> usize {
        let Ok(candidates) = self.list_backups() else { return 0 };
        let now = self.clock.now_millis();
        let threshold_millis = u64::from(days) * 86_400 * 1000;

        let removed: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = candidates
                .iter()
                .map(|path| {
                    scope.spawn(|| {
                        let Ok(meta) = self.fs.metadata(path) else {
                            tracing::warn!(path = %path.display(), "failed to stat backup during cleanup");
                            return false;
                        };
                        if now.saturating_sub(meta.modified_millis) > threshold_millis {
                            match self.fs.remove_file(path) {
                                Ok(()) => true,
                                Err(err) => {
                                    tracing::warn!(path = %path.display(), %err, "failed to remove stale backup");
                                    false
                                }
                            }
                        } else {
                            false
                        }
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap_or(false)).collect()
        });

        removed.into_iter().filter(|removed| *removed).count()
    }

    /// Restore every file in a composite manifest back to its original path.
    ///
    /// # Errors
    /// Propagates the first component restore failure.
    pub fn restore(&self, manifest_path: &Path, _platform: Platform) -> Result<Vec<ComponentName>, DeploymentError> {
        let manifest = self.get_backup_manifest(manifest_path)?;
        let mut restored = Vec::new();
        for name in manifest.components.keys() {
            self.restore_one(&manifest, name)?;
            restored.push(name.clone());
        }
        Ok(restored)
    }
}

/// Derive a manifest path from a backup path via the prescribed
/// `backup_`→`manifest_` textual substitution (§9 Design Notes).
#[must_use]
pub fn manifest_path_for(backup_path: &Path) -> PathBuf {
    let file_name = backup_path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let manifest_name = if let Some(rest) = file_name.strip_prefix("backup_") {
        format!("manifest_{rest}")
    } else {
        format!("manifest_{file_name}")
    };
    let manifest_name = manifest_name.rsplit_once('.').map_or(manifest_name.clone(), |(stem, _)| format!("{stem}.json"));
    backup_path.with_file_name(manifest_name)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use deploy_fs::FakeFilesystem;
    use deploy_model::backup::ComponentBackupEntry;

    use super::*;
    use crate::clock::FixedClock;

    fn store(clock_millis: u64) -> (BackupStore, Arc<FakeFilesystem>) {
        let fake = Arc::new(FakeFilesystem::new());
        let fs: Arc<dyn Filesystem> = fake.clone();
        let clock = Arc::new(FixedClock::new(clock_millis));
        let paths = Paths::new("/home/u/.taptik");
        (BackupStore::new(fs, clock, paths), fake)
    }

    #[test]
    fn manifest_path_substitutes_prefix() {
        let backup = PathBuf::from("/x/backup_20260101_010203.json");
        assert_eq!(manifest_path_for(&backup), PathBuf::from("/x/manifest_20260101_010203.json"));
    }

    #[test]
    fn format_backup_timestamp_matches_expected_shape() {
        // 2024-01-02 03:04:05 UTC
        let millis = 1_704_164_645_000;
        assert_eq!(format_backup_timestamp(millis), "20240102_030405");
    }

    #[test]
    fn create_backup_is_noop_when_target_absent() {
        let (store, _fake) = store(0);
        assert_eq!(store.create_backup(Path::new("/missing.json")).unwrap(), None);
    }

    #[test]
    fn create_backup_then_rollback_restores_content() {
        let (store, fake) = store(1_704_164_645_000);
        let original = PathBuf::from("/project/settings.json");
        fake.seed(original.clone(), b"{\"fontSize\":14}".to_vec());

        let backup_path = store.create_backup(&original).unwrap().unwrap();
        fake.write_atomic(&original, b"{\"fontSize\":16}").unwrap();

        store.rollback(&backup_path).unwrap();
        assert_eq!(fake.read(&original).unwrap(), b"{\"fontSize\":14}");
    }

    fn manifest_with_dependency() -> BackupManifest {
        let mut manifest = BackupManifest::new(Platform::ClaudeCode, 0);
        manifest.record(
            ComponentName::from("settings"),
            ComponentBackupEntry {
                original_path: PathBuf::from("/project/settings.json"),
                backup_path: PathBuf::from("/backups/settings.bak"),
                timestamp: 0,
                dependencies: vec![],
            },
        );
        manifest.record(
            ComponentName::from("agents"),
            ComponentBackupEntry {
                original_path: PathBuf::from("/project/agents.json"),
                backup_path: PathBuf::from("/backups/agents.bak"),
                timestamp: 0,
                dependencies: vec![ComponentName::from("settings")],
            },
        );
        manifest
    }

    #[test]
    fn rollback_with_dependencies_restores_dependency_first() {
        let (store, fake) = store(0);
        fake.seed("/backups/settings.bak", b"settings-orig".to_vec());
        fake.seed("/backups/agents.bak", b"agents-orig".to_vec());
        fake.write_atomic(Path::new("/manifests/m.json"), &serde_json::to_vec(&manifest_with_dependency()).unwrap())
            .unwrap();

        let restored = store.rollback_with_dependencies(Path::new("/manifests/m.json"), &ComponentName::from("agents")).unwrap();
        assert_eq!(restored, vec![ComponentName::from("settings"), ComponentName::from("agents")]);
        assert_eq!(fake.read(Path::new("/project/settings.json")).unwrap(), b"settings-orig");
        assert_eq!(fake.read(Path::new("/project/agents.json")).unwrap(), b"agents-orig");
    }

    #[test]
    fn rollback_component_errors_when_missing_from_manifest() {
        let (store, fake) = store(0);
        fake.write_atomic(Path::new("/manifests/m.json"), &serde_json::to_vec(&manifest_with_dependency()).unwrap())
            .unwrap();
        let err = store.rollback_component(Path::new("/manifests/m.json"), &ComponentName::from("hooks")).unwrap_err();
        assert!(matches!(err, DeploymentError::ComponentNotInManifest { .. }));
    }

    #[test]
    fn cleanup_old_backups_removes_only_expired() {
        let (store, fake) = store(1_000_000_000_000);
        fake.seed("/home/u/.taptik/backups/backup_old.json", b"{}".to_vec());
        fake.set_modified("/home/u/.taptik/backups/backup_old.json", 0);
        fake.seed("/home/u/.taptik/backups/backup_new.json", b"{}".to_vec());
        fake.set_modified("/home/u/.taptik/backups/backup_new.json", 999_999_999_999);

        let removed = store.cleanup_old_backups(30);
        assert_eq!(removed, 1);
        assert!(!fake.exists(Path::new("/home/u/.taptik/backups/backup_old.json")));
        assert!(fake.exists(Path::new("/home/u/.taptik/backups/backup_new.json")));
    }
}
