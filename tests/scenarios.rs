//! End-to-end scenarios S1-S6, against a real filesystem under a temp
//! directory with a fixed clock, per the data model's testable-properties
//! section.

use std::sync::Arc;

use deploy_core::audit::AuditLogger;
use deploy_core::backup::BackupStore;
use deploy_core::clock::{Clock, FixedClock};
use deploy_core::conflict;
use deploy_core::lock::LockManager;
use deploy_core::orchestrator::{Collaborators, Orchestrator, TransformError, Transformer, ValidationOutcome, Validator};
use deploy_core::performance::PerformanceMonitor;
use deploy_core::recovery::{DefaultReconciler, ErrorRecovery};
use deploy_core::{
    ArtifactContent, ArtifactType, ComponentName, Context, DeploymentOptions, Id, Paths, Platform, Resolution, TargetArtifact,
};
use deploy_fs::{Filesystem, StdFilesystem};
use deploy_model::backup::{BackupManifest, ComponentBackupEntry};
use deploy_model::context::Metadata;
use deploy_model::options::{ConflictStrategy, MergeStrategy, StreamingOptions};

struct AlwaysValid;
impl Validator for AlwaysValid {
    fn validate(&self, _context: &Context, _options: &DeploymentOptions) -> ValidationOutcome {
        ValidationOutcome::ok()
    }
}

struct FixedTransform(Vec<TargetArtifact>);
impl Transformer for FixedTransform {
    fn transform(&self, _context: &Context, _options: &DeploymentOptions) -> Result<Vec<TargetArtifact>, TransformError> {
        Ok(self.0.clone())
    }
}

fn empty_context() -> Context {
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

fn base_options(platform: Platform) -> DeploymentOptions {
    DeploymentOptions {
        platform,
        components: vec![],
        skip_components: vec![],
        conflict_strategy: ConflictStrategy::Skip,
        merge_strategy: None,
        dry_run: false,
        validate_only: false,
        backup_enabled: true,
        force_recovery: false,
        cleanup_only: false,
        streaming: StreamingOptions::default(),
    }
}

fn json_artifact(path: std::path::PathBuf, component: &str, value: serde_json::Value) -> TargetArtifact {
    TargetArtifact { path, component: ComponentName::from(component), artifact_type: ArtifactType::Json, content: ArtifactContent::Json(value) }
}

fn orchestrator(
    fs: Arc<dyn Filesystem>,
    clock: Arc<dyn Clock>,
    paths: Paths,
    validator: Arc<dyn Validator>,
    transformer: Arc<dyn Transformer>,
) -> Orchestrator {
    let lock_manager = LockManager::new(fs.clone(), clock.clone(), std::process::id());
    let backup_store = BackupStore::new(fs.clone(), clock.clone(), paths.clone());
    let audit_logger = AuditLogger::new(fs.clone(), clock.clone(), paths.clone());
    let performance_monitor = Arc::new(PerformanceMonitor::new(clock.clone()));
    let reconciler = Arc::new(DefaultReconciler::new(fs.clone()));
    let error_recovery = ErrorRecovery::new(
        LockManager::new(fs.clone(), clock.clone(), std::process::id()),
        BackupStore::new(fs.clone(), clock.clone(), paths.clone()),
        reconciler,
        paths.clone(),
    );
    let collaborators =
        Collaborators { lock_manager, backup_store, audit_logger, performance_monitor, error_recovery, validator, transformer };
    Orchestrator::new(fs, clock, paths, collaborators)
}

#[test]
fn s1_dry_run_of_two_component_context() {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::new(dir.path());
    let fs: Arc<dyn Filesystem> = Arc::new(StdFilesystem::new());
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(1_700_000_000_000));

    let artifacts = vec![
        json_artifact(dir.path().join("settings.json"), "settings", serde_json::json!({"fontSize": 14})),
        json_artifact(dir.path().join("prompts.json"), "ai-prompts", serde_json::json!({"rules": []})),
    ];
    let orch = orchestrator(fs.clone(), clock, paths.clone(), Arc::new(AlwaysValid), Arc::new(FixedTransform(artifacts)));

    let mut options = base_options(Platform::Cursor);
    options.dry_run = true;
    let result = orch.deploy(&empty_context(), options);

    assert!(result.success);
    assert_eq!(result.summary.files_deployed, 0);
    assert_eq!(result.summary.files_skipped, 0);
    assert!(!fs.exists(&dir.path().join("settings.json")));
    assert!(!fs.exists(&dir.path().join("prompts.json")));

    let audit_logger = AuditLogger::new(fs, Arc::new(FixedClock::new(1_700_000_000_000)), paths);
    let entries = audit_logger.get_recent_logs(50).unwrap();
    assert_eq!(entries.iter().filter(|e| e.action == "DEPLOYMENT_INITIATED").count(), 1);
    assert_eq!(entries.iter().filter(|e| e.action == "DEPLOYMENT_COMPLETED").count(), 1);
}

#[test]
fn s2_overwrite_with_backup() {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::new(dir.path());
    let fs: Arc<dyn Filesystem> = Arc::new(StdFilesystem::new());
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(1_700_000_000_000));

    let target = dir.path().join("settings.json");
    fs.write_atomic(&target, br#"{"fontSize":14}"#).unwrap();

    let artifacts = vec![json_artifact(target.clone(), "settings", serde_json::json!({"fontSize": 16}))];
    let orch = orchestrator(fs.clone(), clock, paths.clone(), Arc::new(AlwaysValid), Arc::new(FixedTransform(artifacts)));

    let mut options = base_options(Platform::Cursor);
    options.conflict_strategy = ConflictStrategy::Backup;
    let result = orch.deploy(&empty_context(), options);

    assert!(result.success);
    let written: serde_json::Value = serde_json::from_slice(&fs.read(&target).unwrap()).unwrap();
    assert_eq!(written, serde_json::json!({"fontSize": 16}));

    assert_eq!(result.conflicts.len(), 1);
    assert_eq!(result.conflicts[0].resolution, Resolution::BackedUp);

    let backup_children = fs.read_dir(&paths.backups_dir()).unwrap();
    let backup_json_files: Vec<_> = backup_children
        .iter()
        .filter(|p| p.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with("backup_") && n.ends_with(".json")))
        .collect();
    assert_eq!(backup_json_files.len(), 1);
    let backed_up: serde_json::Value = serde_json::from_slice(&fs.read(backup_json_files[0]).unwrap()).unwrap();
    assert_eq!(backed_up, serde_json::json!({"fontSize": 14}));
}

#[test]
fn s3_deep_merge_three_way() {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::new(dir.path());
    let fs: Arc<dyn Filesystem> = Arc::new(StdFilesystem::new());
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(1_700_000_000_000));

    let target = dir.path().join("settings.json");
    let existing = serde_json::json!({"user":{"name":"A","age":30},"settings":{"theme":"dark"}});
    fs.write_atomic(&target, &serde_json::to_vec(&existing).unwrap()).unwrap();

    let new_value = serde_json::json!({"user":{"name":"A","email":"x"},"settings":{"lang":"en"}});
    let artifacts = vec![json_artifact(target.clone(), "settings", new_value)];
    let orch = orchestrator(fs.clone(), clock, paths, Arc::new(AlwaysValid), Arc::new(FixedTransform(artifacts)));

    let mut options = base_options(Platform::Cursor);
    options.conflict_strategy = ConflictStrategy::MergeIntelligent;
    options.merge_strategy = Some(MergeStrategy::DeepMerge);
    let result = orch.deploy(&empty_context(), options);

    assert!(result.success);
    let written: serde_json::Value = serde_json::from_slice(&fs.read(&target).unwrap()).unwrap();
    assert_eq!(written, serde_json::json!({"user":{"name":"A","age":30,"email":"x"},"settings":{"theme":"dark","lang":"en"}}));
}

#[test]
fn s4_task_status_preservation() {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::new(dir.path());
    let fs: Arc<dyn Filesystem> = Arc::new(StdFilesystem::new());
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(1_700_000_000_000));

    let target = dir.path().join("spec.md");
    fs.write_atomic(&target, b"- [x] 1.1 Foo\n- [ ] 1.2 Bar\n").unwrap();

    let new_text = "- [ ] 1.1 Foo updated\n- [ ] 1.2 Bar\n- [ ] 1.3 Baz\n";
    let artifact =
        TargetArtifact { path: target.clone(), component: ComponentName::from("specs"), artifact_type: ArtifactType::Markdown, content: ArtifactContent::Text(new_text.to_owned()) };
    let orch = orchestrator(fs.clone(), clock, paths, Arc::new(AlwaysValid), Arc::new(FixedTransform(vec![artifact])));

    let mut options = base_options(Platform::Cursor);
    options.conflict_strategy = ConflictStrategy::PreserveTasks;
    let result = orch.deploy(&empty_context(), options);

    assert!(result.success);
    let written = String::from_utf8(fs.read(&target).unwrap()).unwrap();
    assert!(written.contains("- [x] 1.1 Foo updated"));
    assert!(written.contains("- [ ] 1.2 Bar"));
    assert!(written.contains("- [ ] 1.3 Baz"));
}

#[test]
fn s5_rollback_with_dependencies_restores_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::new(dir.path());
    let fs: Arc<dyn Filesystem> = Arc::new(StdFilesystem::new());
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(1_700_000_000_000));
    let store = BackupStore::new(fs.clone(), clock, paths);

    let settings_path = dir.path().join("settings.json");
    let agents_path = dir.path().join("agents.json");
    fs.write_atomic(&settings_path, br#"{"v":1}"#).unwrap();
    fs.write_atomic(&agents_path, br#"{"v":2}"#).unwrap();

    let settings_backup = store.create_backup(&settings_path).unwrap().unwrap();
    let agents_backup = store.create_backup(&agents_path).unwrap().unwrap();

    // Deployment overwrites both, then the orchestrator's caller finds out
    // it failed and drives a dependency-ordered rollback.
    fs.write_atomic(&settings_path, br#"{"v":99}"#).unwrap();
    fs.write_atomic(&agents_path, br#"{"v":98}"#).unwrap();

    let mut manifest = BackupManifest::new(Platform::Cursor, 1_700_000_000_000);
    manifest.record(
        ComponentName::from("settings"),
        ComponentBackupEntry { original_path: settings_path.clone(), backup_path: settings_backup, timestamp: 0, dependencies: vec![] },
    );
    manifest.record(
        ComponentName::from("agents"),
        ComponentBackupEntry {
            original_path: agents_path.clone(),
            backup_path: agents_backup,
            timestamp: 0,
            dependencies: vec![ComponentName::from("settings")],
        },
    );
    let manifest_path = store.write_manifest(&manifest).unwrap();

    let restored = store.rollback_with_dependencies(&manifest_path, &ComponentName::from("agents")).unwrap();
    assert_eq!(restored, vec![ComponentName::from("settings"), ComponentName::from("agents")]);

    assert_eq!(fs.read(&settings_path).unwrap(), br#"{"v":1}"#);
    assert_eq!(fs.read(&agents_path).unwrap(), br#"{"v":2}"#);
}

#[test]
fn s6_cyclic_dependency_restores_each_component_once() {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::new(dir.path());
    let fs: Arc<dyn Filesystem> = Arc::new(StdFilesystem::new());
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(1_700_000_000_000));
    let store = BackupStore::new(fs.clone(), clock, paths);

    let a_path = dir.path().join("a.json");
    let b_path = dir.path().join("b.json");
    fs.write_atomic(&a_path, br#"{"a":1}"#).unwrap();
    fs.write_atomic(&b_path, br#"{"b":1}"#).unwrap();
    let a_backup = store.create_backup(&a_path).unwrap().unwrap();
    let b_backup = store.create_backup(&b_path).unwrap().unwrap();

    let mut manifest = BackupManifest::new(Platform::Cursor, 1_700_000_000_000);
    manifest.record(
        ComponentName::from("a"),
        ComponentBackupEntry { original_path: a_path, backup_path: a_backup, timestamp: 0, dependencies: vec![ComponentName::from("b")] },
    );
    manifest.record(
        ComponentName::from("b"),
        ComponentBackupEntry { original_path: b_path, backup_path: b_backup, timestamp: 0, dependencies: vec![ComponentName::from("a")] },
    );
    let manifest_path = store.write_manifest(&manifest).unwrap();

    let restored = store.rollback_with_dependencies(&manifest_path, &ComponentName::from("a")).unwrap();
    assert_eq!(restored.len(), 2);
    assert!(restored.contains(&ComponentName::from("a")));
    assert!(restored.contains(&ComponentName::from("b")));
}

#[test]
fn conflict_resolve_is_reachable_through_the_public_api() {
    let outcome = conflict::resolve(
        std::path::Path::new("/x/settings.json"),
        None,
        b"{}",
        ConflictStrategy::Overwrite,
        None,
    )
    .unwrap();
    assert_eq!(outcome.resolution, Resolution::Overwritten);
}

#[test]
fn deployment_id_generation_is_exposed() {
    let a = Id::generate();
    let b = Id::generate();
    assert_ne!(a, b);
}
