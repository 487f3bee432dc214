//! The Deployment Orchestrator (§4.9): the single state machine that owns
//! a deployment from lock acquisition through final audit entry.
//!
//! Everything else in this crate is a collaborator the orchestrator calls
//! in a fixed order; this module is the only place that sequences them.
//! The two seams left for the caller to fill in — fetching a [`Context`]
//! and turning it into platform-specific files — are the [`Validator`] and
//! [`Transformer`] traits (§4.9.1); this crate ships no implementation of
//! either.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use deploy_model::artifact::TargetArtifact;
use deploy_model::context::Context;
use deploy_model::ids::{ComponentName, Id, Platform};
use deploy_model::options::DeploymentOptions;
use deploy_model::result::{ConflictRecord, DeploymentResult, ErrorRecord, Resolution, Severity};
use deploy_fs::Filesystem;
use sha2::{Digest, Sha256};

use crate::audit::AuditLogger;
use crate::backup::BackupStore;
use crate::clock::Clock;
use crate::conflict;
use crate::error::DeploymentError;
use crate::lock::LockManager;
use crate::paths::Paths;
use crate::performance::PerformanceMonitor;
use crate::recovery::ErrorRecovery;

/// Outcome of [`Validator::validate`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Whether the context/options pair is acceptable to deploy.
    pub valid: bool,
    /// Human-readable messages; populated whether or not `valid` is true.
    pub messages: Vec<String>,
}

impl ValidationOutcome {
    /// An outcome with no messages and `valid = true`.
    #[must_use]
    pub fn ok() -> Self {
        Self { valid: true, messages: Vec::new() }
    }
}

/// External, out-of-scope seam: decides whether a [`Context`] is fit to
/// deploy under the given options (§4.9.1). No implementation ships here.
pub trait Validator: Send + Sync {
    /// Validate `context` against `options`.
    fn validate(&self, context: &Context, options: &DeploymentOptions) -> ValidationOutcome;
}

/// Failure to produce a target artifact set.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransformError(pub String);

/// External, out-of-scope seam: turns a validated [`Context`] into the
/// concrete files a platform expects (§4.9.1). No implementation ships
/// here — that is the per-platform transformer's job.
pub trait Transformer: Send + Sync {
    /// Produce the target artifacts for `context` under `options`.
    ///
    /// # Errors
    /// Returns a [`TransformError`] describing why transformation failed.
    fn transform(&self, context: &Context, options: &DeploymentOptions) -> Result<Vec<TargetArtifact>, TransformError>;
}

/// Every already-constructed collaborator the orchestrator drives, plus
/// the two external seams (§4.9.1).
pub struct Collaborators {
    /// Cross-process mutual exclusion.
    pub lock_manager: LockManager,
    /// Backup creation, manifest persistence, and rollback.
    pub backup_store: BackupStore,
    /// Structured audit/human logging.
    pub audit_logger: AuditLogger,
    /// Timing and memory tracking.
    pub performance_monitor: Arc<PerformanceMonitor>,
    /// Post-failure reconciliation.
    pub error_recovery: ErrorRecovery,
    /// Context validation (out of scope; caller-supplied).
    pub validator: Arc<dyn Validator>,
    /// Context-to-artifact transformation (out of scope; caller-supplied).
    pub transformer: Arc<dyn Transformer>,
}

/// Drives one deployment end to end (§4.9): `Idle -> Locked -> Validated ->
/// Transformed -> BackedUp -> Writing -> Audited -> Done`, with a
/// `RollingBack -> Recovered | FailedFatally` branch reachable from any
/// state after `Locked`.
pub struct Orchestrator {
    fs: Arc<dyn Filesystem>,
    clock: Arc<dyn Clock>,
    paths: Paths,
    collaborators: Collaborators,
}

impl Orchestrator {
    /// Construct an orchestrator from its collaborators.
    #[must_use]
    pub fn new(fs: Arc<dyn Filesystem>, clock: Arc<dyn Clock>, paths: Paths, collaborators: Collaborators) -> Self {
        Self { fs, clock, paths, collaborators }
    }

    fn deployment_lock_path(&self, platform: Platform) -> PathBuf {
        let protected = self.paths.locks_dir().join(platform.to_string());
        self.paths.lock_path_for(&protected)
    }

    /// Run one deployment of `context` under `options`.
    ///
    /// Never panics and never propagates a `DeploymentError` to the
    /// caller: every failure mode is folded into the returned
    /// [`DeploymentResult`] (§7 — "no partial state escapes unreported").
    #[must_use]
    pub fn deploy(&self, context: &Context, options: DeploymentOptions) -> DeploymentResult {
        let id = Id::generate();
        let platform = options.platform;
        let mut result = DeploymentResult::empty(platform);

        self.collaborators.performance_monitor.start_deployment(&id);
        let _ = self.collaborators.audit_logger.log_deployment_start(platform, Some(id.to_string()));

        let lock_path = self.deployment_lock_path(platform);
        let handle = match self.collaborators.lock_manager.acquire(&lock_path) {
            Ok(handle) => handle,
            Err(err) => {
                result.errors.push(fatal_error("lock-unavailable", &err.to_string()));
                self.collaborators.performance_monitor.end_deployment(&id);
                let _ = self.collaborators.audit_logger.log_deployment_complete(platform, false, Some(id.to_string()));
                return result;
            }
        };

        let outcome = self.run_locked(&id, context, &options, &mut result);
        if let Err(err) = outcome {
            result.errors.push(fatal_error(recovery_code(&err), &err.to_string()));
            let manifest_path = result.backup_manifest_id.as_ref().map(|backup_id| {
                self.paths.backup_dir(&platform.to_string(), backup_id.as_str()).join("manifest.json")
            });
            let recovery = self.collaborators.error_recovery.recover_from_failure(&result, &options, manifest_path.as_deref());
            result.errors.extend(recovery.errors);
            result.success = false;
            let _ = self.collaborators.audit_logger.log_rollback(platform, recovery.success);
        } else if let Err(err) = self.collaborators.lock_manager.release(&handle) {
            result.warnings.push(deploy_model::result::WarningRecord {
                code: "lock-release-failed".to_owned(),
                message: err.to_string(),
            });
        }

        result.summary.duration_millis = self.collaborators.performance_monitor.end_deployment(&id).unwrap_or(0);
        let _ = self.collaborators.audit_logger.log_deployment_complete(platform, result.success, Some(id.to_string()));
        result
    }

    /// Everything from `Validated` through `Audited`, run while the
    /// deployment lock is held. A returned `Err` means the lock is still
    /// held and the caller must route through rollback/recovery; `Ok`
    /// means the lock still needs releasing by the caller on the happy
    /// path (recovery releases it itself via `release_all`).
    fn run_locked(
        &self,
        id: &Id,
        context: &Context,
        options: &DeploymentOptions,
        result: &mut DeploymentResult,
    ) -> Result<(), DeploymentError> {
        let validation = self.collaborators.validator.validate(context, options);
        if !validation.valid && !options.force_recovery {
            return Err(DeploymentError::ValidationFailed { messages: validation.messages });
        }

        let artifacts = self
            .collaborators
            .transformer
            .transform(context, options)
            .map_err(|err| DeploymentError::TransformationFailed { detail: err.0 })?;

        if options.validate_only {
            result.success = true;
            return Ok(());
        }

        let context_hash = hash_context(context);
        if options.backup_enabled {
            let manifest_id = self.back_up(id, &artifacts, context_hash, options, result)?;
            result.backup_manifest_id = Some(manifest_id);
        }

        self.write_artifacts(id, &artifacts, options, result)?;

        result.success = true;
        Ok(())
    }

    fn back_up(
        &self,
        id: &Id,
        artifacts: &[TargetArtifact],
        context_hash: String,
        options: &DeploymentOptions,
        _result: &mut DeploymentResult,
    ) -> Result<Id, DeploymentError> {
        let mut manifest = deploy_model::backup::BackupManifest::new(options.platform, self.clock.now_millis());
        manifest.original_context_hash = Some(context_hash);
        manifest.id = id.clone();

        for artifact in artifacts {
            if !self.fs.exists(&artifact.path) {
                continue;
            }
            let Some(backup_path) = self.collaborators.backup_store.create_backup(&artifact.path)? else { continue };
            manifest.record(
                artifact.component.clone(),
                deploy_model::backup::ComponentBackupEntry {
                    original_path: artifact.path.clone(),
                    backup_path,
                    timestamp: self.clock.now_millis(),
                    dependencies: Vec::new(),
                },
            );
        }

        if !manifest.components.is_empty() {
            self.collaborators.backup_store.write_manifest(&manifest)?;
        }
        Ok(manifest.id)
    }

    fn write_artifacts(
        &self,
        id: &Id,
        artifacts: &[TargetArtifact],
        options: &DeploymentOptions,
        result: &mut DeploymentResult,
    ) -> Result<(), DeploymentError> {
        let mut deployed = Vec::new();
        for artifact in artifacts {
            self.collaborators.performance_monitor.start_component(id, &artifact.component);
            self.write_one_artifact(artifact, options, result)?;
            self.collaborators.performance_monitor.end_component(id, &artifact.component);
            self.collaborators.performance_monitor.record_memory(id, artifact.component.as_str());
            if !deployed.contains(&artifact.component) {
                deployed.push(artifact.component.clone());
            }
        }
        result.deployed_components = deployed;
        Ok(())
    }

    fn write_one_artifact(
        &self,
        artifact: &TargetArtifact,
        options: &DeploymentOptions,
        result: &mut DeploymentResult,
    ) -> Result<(), DeploymentError> {
        let new_content = artifact.content.as_bytes();
        let existing = if self.fs.exists(&artifact.path) { Some(self.fs.read(&artifact.path)?) } else { None };
        let conflicts = conflict::detect_conflicts(&artifact.path, existing.as_deref(), &new_content);

        if conflicts.is_empty() {
            if options.dry_run {
                return Ok(());
            }
            self.write_bytes(&artifact.path, &new_content, options)?;
            result.summary.files_deployed += 1;
            let _ = self.collaborators.audit_logger.log_component_deployment(&artifact.component, Resolution::Overwritten);
            return Ok(());
        }

        let outcome = conflict::resolve(&artifact.path, existing.as_deref(), &new_content, options.conflict_strategy, options.merge_strategy)?;
        result.conflicts.push(ConflictRecord {
            path: artifact.path.clone(),
            component: artifact.component.clone(),
            strategy: options.conflict_strategy,
            merge_strategy: options.merge_strategy,
            resolution: outcome.resolution,
        });
        result.summary.conflicts_resolved += 1;

        if options.dry_run {
            return Ok(());
        }

        match (&outcome.content, outcome.resolution) {
            (Some(content), resolution) if resolution != Resolution::Skipped => {
                self.write_bytes(&artifact.path, content, options)?;
                result.summary.files_deployed += 1;
            }
            _ => {
                result.summary.files_skipped += 1;
            }
        }

        let _ = self.collaborators.audit_logger.log_component_deployment(&artifact.component, outcome.resolution);
        Ok(())
    }

    /// Write `bytes` to `path`, routing through the Large-File Streamer
    /// (§4.5) once `bytes` is at or above `options.streaming
    /// .large_file_threshold_bytes`; everything smaller goes through a
    /// single atomic write.
    fn write_bytes(&self, path: &Path, bytes: &[u8], options: &DeploymentOptions) -> Result<(), DeploymentError> {
        let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        if !deploy_stream::is_large_file(size, options.streaming.large_file_threshold_bytes) {
            return self.fs.write_atomic(path, bytes).map_err(DeploymentError::from);
        }
        self.stream_write(path, bytes, options)
    }

    /// Serialize-once-and-slice path for a large artifact: re-parses
    /// `bytes` as JSON so it can be driven through
    /// [`deploy_stream::stream_process`] chunk by chunk (the same shape
    /// whether the artifact's own content or a conflict-merged result
    /// produced those bytes); markdown/text content, which is never valid
    /// JSON, falls back to chunking the raw bytes directly via
    /// [`deploy_stream::create_chunked_stream`]. Either way, the file is
    /// removed first since chunks land via sequential appends rather than
    /// one atomic rename, and the written content is read back and
    /// integrity-checked before returning.
    fn stream_write(&self, path: &Path, bytes: &[u8], options: &DeploymentOptions) -> Result<(), DeploymentError> {
        if self.fs.exists(path) {
            self.fs.remove_file(path)?;
        }
        let chunk_size = usize::try_from(options.streaming.chunk_size_bytes).unwrap_or(deploy_stream::DEFAULT_CHUNK_SIZE);

        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) {
            let fs = self.fs.clone();
            let write_path = path.to_path_buf();
            let processor = |chunk: &[u8], _index: usize| fs.append(&write_path, chunk).map_err(|e| e.to_string());
            deploy_stream::stream_process(&value, chunk_size, processor, None::<fn(deploy_stream::ProgressUpdate)>)?;

            let written = self.fs.read(path)?;
            let reconstructed = deploy_stream::create_chunked_stream(&written, chunk_size);
            if !deploy_stream::validate_chunk_integrity(reconstructed.chunks(), &value) {
                return Err(DeploymentError::ChecksumMismatch { path: path.to_path_buf() });
            }
            return Ok(());
        }

        let chunked = deploy_stream::create_chunked_stream(bytes, chunk_size);
        for chunk in chunked.chunks() {
            self.fs.append(path, chunk)?;
        }
        let written = self.fs.read(path)?;
        if written != bytes {
            return Err(DeploymentError::ChecksumMismatch { path: path.to_path_buf() });
        }
        Ok(())
    }
}

fn hash_context(context: &Context) -> String {
    let bytes = serde_json::to_vec(context).unwrap_or_default();
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn fatal_error(code: &str, message: &str) -> ErrorRecord {
    ErrorRecord { code: code.to_owned(), message: message.to_owned(), severity: Severity::Critical, component: None, file_path: None, suggestion: None }
}

fn recovery_code(err: &DeploymentError) -> &'static str {
    match err {
        DeploymentError::ValidationFailed { .. } => "validation-failed",
        DeploymentError::TransformationFailed { .. } => "transformation-failed",
        DeploymentError::BackupWriteFailed { .. } => "backup-write-failed",
        DeploymentError::WriteFailed { .. } => "write-failed",
        DeploymentError::ConflictUnresolvable { .. } => "conflict-unresolvable",
        DeploymentError::MergeIncompatible { .. } => "merge-incompatible",
        _ => "deployment-failed",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use deploy_fs::FakeFilesystem;
    use deploy_model::context::Metadata;
    use deploy_model::options::{ConflictStrategy, StreamingOptions};

    use super::*;
    use crate::clock::FixedClock;
    use crate::recovery::DefaultReconciler;

    struct AlwaysValid;
    impl Validator for AlwaysValid {
        fn validate(&self, _context: &Context, _options: &DeploymentOptions) -> ValidationOutcome {
            ValidationOutcome::ok()
        }
    }

    struct AlwaysInvalid;
    impl Validator for AlwaysInvalid {
        fn validate(&self, _context: &Context, _options: &DeploymentOptions) -> ValidationOutcome {
            ValidationOutcome { valid: false, messages: vec!["missing required field".to_owned()] }
        }
    }

    struct FixedTransform(Vec<TargetArtifact>);
    impl Transformer for FixedTransform {
        fn transform(&self, _context: &Context, _options: &DeploymentOptions) -> Result<Vec<TargetArtifact>, TransformError> {
            Ok(self.0.clone())
        }
    }

    fn context() -> Context {
        Context {
            metadata: Metadata {
                project_name: "demo".to_owned(),
                source_platform: None,
                target_platform: None,
                tags: vec![],
                created_at: 0,
                updated_at: 0,
                extra: Default::default(),
            },
            personal_context: Default::default(),
            project_context: Default::default(),
            prompt_context: Default::default(),
            security: None,
        }
    }

    fn options() -> DeploymentOptions {
        DeploymentOptions {
            platform: Platform::Cursor,
            components: vec![],
            skip_components: vec![],
            conflict_strategy: ConflictStrategy::Overwrite,
            merge_strategy: None,
            dry_run: false,
            validate_only: false,
            backup_enabled: true,
            force_recovery: false,
            cleanup_only: false,
            streaming: StreamingOptions::default(),
        }
    }

    fn build(validator: Arc<dyn Validator>, transformer: Arc<dyn Transformer>) -> (Orchestrator, Arc<FakeFilesystem>) {
        let fake = Arc::new(FakeFilesystem::new());
        let fs: Arc<dyn Filesystem> = fake.clone();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(1_000));
        let paths = Paths::new("/home/u/.taptik");
        let lock_manager = LockManager::new(fs.clone(), clock.clone(), 1);
        let backup_store = BackupStore::new(fs.clone(), clock.clone(), paths.clone());
        let audit_logger = AuditLogger::new(fs.clone(), clock.clone(), paths.clone());
        let performance_monitor = Arc::new(PerformanceMonitor::new(clock.clone()));
        let reconciler = Arc::new(DefaultReconciler::new(fs.clone()));
        let recovery_lock_manager = LockManager::new(fs.clone(), clock.clone(), 1);
        let recovery_backup_store = BackupStore::new(fs.clone(), clock.clone(), paths.clone());
        let error_recovery = ErrorRecovery::new(recovery_lock_manager, recovery_backup_store, reconciler, paths.clone());
        let collaborators =
            Collaborators { lock_manager, backup_store, audit_logger, performance_monitor, error_recovery, validator, transformer };
        (Orchestrator::new(fs, clock, paths, collaborators), fake)
    }

    #[test]
    fn deploys_new_file_with_no_existing_target() {
        let artifact = TargetArtifact {
            path: PathBuf::from("/home/u/project/settings.json"),
            component: ComponentName::from("settings"),
            artifact_type: deploy_model::artifact::ArtifactType::Json,
            content: deploy_model::artifact::ArtifactContent::Json(serde_json::json!({"fontSize": 14})),
        };
        let (orchestrator, fake) = build(Arc::new(AlwaysValid), Arc::new(FixedTransform(vec![artifact])));
        let result = orchestrator.deploy(&context(), options());
        assert!(result.success);
        assert_eq!(result.summary.files_deployed, 1);
        assert!(fake.exists(std::path::Path::new("/home/u/project/settings.json")));
    }

    #[test]
    fn validation_failure_is_fatal_and_releases_lock() {
        let (orchestrator, _fake) = build(Arc::new(AlwaysInvalid), Arc::new(FixedTransform(vec![])));
        let result = orchestrator.deploy(&context(), options());
        assert!(!result.success);
        assert!(result.errors.iter().any(|e| e.code == "validation-failed"));
        let lock_path = orchestrator.deployment_lock_path(Platform::Cursor);
        assert!(!orchestrator.collaborators.lock_manager.is_locked(&lock_path));
    }

    #[test]
    fn conflicting_existing_file_is_backed_up_then_overwritten() {
        let existing = PathBuf::from("/home/u/project/settings.json");
        let fake = Arc::new(FakeFilesystem::new());
        fake.seed(existing.to_str().unwrap(), br#"{"fontSize":12}"#.to_vec());
        let fs: Arc<dyn Filesystem> = fake.clone();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(1_000));
        let paths = Paths::new("/home/u/.taptik");
        let lock_manager = LockManager::new(fs.clone(), clock.clone(), 1);
        let backup_store = BackupStore::new(fs.clone(), clock.clone(), paths.clone());
        let audit_logger = AuditLogger::new(fs.clone(), clock.clone(), paths.clone());
        let performance_monitor = Arc::new(PerformanceMonitor::new(clock.clone()));
        let reconciler = Arc::new(DefaultReconciler::new(fs.clone()));
        let error_recovery = ErrorRecovery::new(
            LockManager::new(fs.clone(), clock.clone(), 1),
            BackupStore::new(fs.clone(), clock.clone(), paths.clone()),
            reconciler,
            paths.clone(),
        );
        let artifact = TargetArtifact {
            path: existing.clone(),
            component: ComponentName::from("settings"),
            artifact_type: deploy_model::artifact::ArtifactType::Json,
            content: deploy_model::artifact::ArtifactContent::Json(serde_json::json!({"fontSize": 14})),
        };
        let collaborators = Collaborators {
            lock_manager,
            backup_store,
            audit_logger,
            performance_monitor,
            error_recovery,
            validator: Arc::new(AlwaysValid),
            transformer: Arc::new(FixedTransform(vec![artifact])),
        };
        let orchestrator = Orchestrator::new(fs, clock, paths, collaborators);

        let mut opts = options();
        opts.conflict_strategy = ConflictStrategy::Backup;
        let result = orchestrator.deploy(&context(), opts);

        assert!(result.success);
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].resolution, Resolution::BackedUp);
        assert!(result.backup_manifest_id.is_some());
    }

    #[test]
    fn validate_only_produces_no_writes() {
        let artifact = TargetArtifact {
            path: PathBuf::from("/home/u/project/settings.json"),
            component: ComponentName::from("settings"),
            artifact_type: deploy_model::artifact::ArtifactType::Json,
            content: deploy_model::artifact::ArtifactContent::Json(serde_json::json!({"fontSize": 14})),
        };
        let (orchestrator, fake) = build(Arc::new(AlwaysValid), Arc::new(FixedTransform(vec![artifact])));
        let mut opts = options();
        opts.validate_only = true;
        let result = orchestrator.deploy(&context(), opts);
        assert!(result.success);
        assert_eq!(result.summary.files_deployed, 0);
        assert!(!fake.exists(std::path::Path::new("/home/u/project/settings.json")));
    }

    #[test]
    fn large_json_artifact_is_routed_through_the_chunked_streamer() {
        let big = deploy_model::artifact::ArtifactContent::Json(serde_json::json!({"blob": "x".repeat(500)}));
        let path = PathBuf::from("/home/u/project/large.json");
        let artifact = TargetArtifact {
            path: path.clone(),
            component: ComponentName::from("large"),
            artifact_type: deploy_model::artifact::ArtifactType::Json,
            content: big.clone(),
        };
        let (orchestrator, fake) = build(Arc::new(AlwaysValid), Arc::new(FixedTransform(vec![artifact])));
        let mut opts = options();
        opts.streaming.large_file_threshold_bytes = 64;
        opts.streaming.chunk_size_bytes = 32;

        let result = orchestrator.deploy(&context(), opts);

        assert!(result.success, "errors: {:?}", result.errors);
        assert_eq!(result.summary.files_deployed, 1);
        let written = fake.read(&path).expect("large artifact written");
        let decoded: serde_json::Value = serde_json::from_slice(&written).unwrap();
        assert_eq!(decoded, big.as_json().unwrap().clone());
    }

    #[test]
    fn large_text_artifact_falls_back_to_raw_chunking() {
        let text = "line\n".repeat(50);
        let path = PathBuf::from("/home/u/project/NOTES.md");
        let artifact = TargetArtifact {
            path: path.clone(),
            component: ComponentName::from("notes"),
            artifact_type: deploy_model::artifact::ArtifactType::Markdown,
            content: deploy_model::artifact::ArtifactContent::Text(text.clone()),
        };
        let (orchestrator, fake) = build(Arc::new(AlwaysValid), Arc::new(FixedTransform(vec![artifact])));
        let mut opts = options();
        opts.streaming.large_file_threshold_bytes = 32;
        opts.streaming.chunk_size_bytes = 16;

        let result = orchestrator.deploy(&context(), opts);

        assert!(result.success, "errors: {:?}", result.errors);
        let written = fake.read(&path).expect("large text artifact written");
        assert_eq!(String::from_utf8(written).unwrap(), text);
    }
}
