//! Error Recovery (§4.8): post-failure reconciliation across a partially
//! written deployment.
//!
//! Grounded on the reference crate's own merge-abort-and-recover path: mark
//! the failure, undo as much as is safely undoable, never panic, report
//! what could and couldn't be fixed.

use std::path::Path;
use std::sync::Arc;

use deploy_fs::Filesystem;
use deploy_model::ids::{ComponentName, Id, Platform};
use deploy_model::options::DeploymentOptions;
use deploy_model::result::{DeploymentResult, ErrorRecord, Severity};

use crate::backup::BackupStore;
use crate::lock::LockManager;
use crate::paths::Paths;

/// Per-component "validate path + reconcile" routine (§4.8.1).
///
/// The default implementation only checks that the artifact's parent
/// directory still exists, since deeper per-component semantics belong to
/// the (out-of-scope) per-platform transformers.
pub trait ComponentReconciler: Send + Sync {
    /// Reconcile `component`'s on-disk state at `artifact_path` after a
    /// failed deployment.
    ///
    /// # Errors
    /// Returns a human-readable reason the component could not be
    /// reconciled.
    fn reconcile(&self, component: &ComponentName, artifact_path: &Path) -> Result<(), String>;
}

/// The reconciler shipped by the core: verifies the artifact's parent
/// directory exists. Cannot verify writability through the [`Filesystem`]
/// trait's read-oriented surface, so that check is left to the caller's own
/// transformer-level reconciler if it needs one.
pub struct DefaultReconciler {
    fs: Arc<dyn Filesystem>,
}

impl DefaultReconciler {
    /// Construct a reconciler backed by `fs`.
    #[must_use]
    pub fn new(fs: Arc<dyn Filesystem>) -> Self {
        Self { fs }
    }
}

impl ComponentReconciler for DefaultReconciler {
    fn reconcile(&self, _component: &ComponentName, artifact_path: &Path) -> Result<(), String> {
        let Some(parent) = artifact_path.parent() else {
            return Err("artifact path has no parent directory".to_owned());
        };
        if self.fs.exists(parent) {
            Ok(())
        } else {
            Err(format!("parent directory '{}' no longer exists", parent.display()))
        }
    }
}

/// Outcome of [`ErrorRecovery::recover_from_failure`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryOutcome {
    /// True iff locks-release, restore, and per-component reconciliation
    /// produced no errors. Cleanup failures do not affect this.
    pub success: bool,
    /// Id of the backup manifest that was restored, if any.
    pub restored_backup_id: Option<Id>,
    /// Components that were successfully reconciled.
    pub recovered_components: Vec<ComponentName>,
    /// Errors accumulated along the way.
    pub errors: Vec<ErrorRecord>,
}

/// Coordinates lock release, backup restore, and per-component
/// reconciliation after a failed deployment.
pub struct ErrorRecovery {
    lock_manager: LockManager,
    backup_store: BackupStore,
    reconciler: Arc<dyn ComponentReconciler>,
    paths: Paths,
}

impl ErrorRecovery {
    /// Construct the recovery service from its already-built collaborators.
    #[must_use]
    pub fn new(lock_manager: LockManager, backup_store: BackupStore, reconciler: Arc<dyn ComponentReconciler>, paths: Paths) -> Self {
        Self { lock_manager, backup_store, reconciler, paths }
    }

    /// Run the recovery protocol (§4.8) against `result`.
    ///
    /// `manifest_path` locates the composite manifest to restore from, when
    /// `result.backup_manifest_id` or an explicit override is present.
    pub fn recover_from_failure(
        &self,
        result: &DeploymentResult,
        options: &DeploymentOptions,
        manifest_path: Option<&Path>,
    ) -> RecoveryOutcome {
        let mut errors = Vec::new();

        if let Err(err) = self.lock_manager.release_all(&self.paths.locks_dir()) {
            errors.push(error_record("lock-release-failed", &err.to_string(), Severity::High));
        }

        if options.cleanup_only {
            return RecoveryOutcome { success: errors.is_empty(), restored_backup_id: None, recovered_components: Vec::new(), errors };
        }

        let mut restored_backup_id = None;
        if let (Some(manifest_path), Some(backup_id)) = (manifest_path, result.backup_manifest_id.clone()) {
            match self.backup_store.restore(manifest_path, result.platform) {
                Ok(_) => restored_backup_id = Some(backup_id),
                Err(err) => errors.push(error_record("backup-restore-failed", &err.to_string(), Severity::Critical)),
            }
        }

        let manifest = manifest_path.and_then(|path| self.backup_store.get_backup_manifest(path).ok());

        let mut recovered_components = Vec::new();
        for component in &result.deployed_components {
            let Some(artifact_path) =
                manifest.as_ref().and_then(|m| m.components.get(component)).map(|entry| entry.original_path.clone())
            else {
                errors.push(ErrorRecord {
                    code: "component-reconcile-failed".to_owned(),
                    message: format!("no backup manifest entry for component '{component}'"),
                    severity: Severity::Medium,
                    component: Some(component.clone()),
                    file_path: None,
                    suggestion: Some("verify the backup manifest was written before the failure".to_owned()),
                });
                continue;
            };
            match self.reconciler.reconcile(component, &artifact_path) {
                Ok(()) => recovered_components.push(component.clone()),
                Err(reason) => errors.push(ErrorRecord {
                    code: "component-reconcile-failed".to_owned(),
                    message: reason,
                    severity: Severity::Medium,
                    component: Some(component.clone()),
                    file_path: Some(artifact_path),
                    suggestion: Some("verify the component's target directory still exists and is writable".to_owned()),
                }),
            }
        }

        let success = errors.is_empty();

        let _ = self.lock_manager.cleanup_stale_locks(&self.paths.locks_dir());
        let _ = self.backup_store.cleanup_old_backups(retention_days(result.platform));

        RecoveryOutcome { success, restored_backup_id, recovered_components, errors }
    }

    /// Whether `outcome` accounts for every component in `expected` with no
    /// accumulated errors.
    #[must_use]
    pub fn validate_recovery(outcome: &RecoveryOutcome, expected_components: &[ComponentName]) -> bool {
        outcome.errors.is_empty() && expected_components.iter().all(|c| outcome.recovered_components.contains(c))
    }
}

fn retention_days(platform: Platform) -> u32 {
    platform.backup_retention_days()
}

fn error_record(code: &str, message: &str, severity: Severity) -> ErrorRecord {
    ErrorRecord { code: code.to_owned(), message: message.to_owned(), severity, component: None, file_path: None, suggestion: None }
}
