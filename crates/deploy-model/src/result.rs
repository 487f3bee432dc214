//! Outcome types surfaced to the caller (§3, §7): [`DeploymentResult`],
//! its nested records, and the structured shape of one [`AuditEntry`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{ComponentName, Id, Platform};
use crate::options::{ConflictStrategy, MergeStrategy};

/// How a single conflict was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    /// No write occurred; a warning was recorded.
    Skipped,
    /// New content replaced the target verbatim.
    Overwritten,
    /// Existing content was copied aside before the new content was written.
    BackedUp,
    /// New and existing content were merged.
    Merged,
    /// Checked task-list items were carried forward.
    TasksPreserved,
    /// Resolution deferred to the (out-of-scope) interactive resolver.
    PromptRequired,
}

/// One conflict the orchestrator encountered and resolved, recorded on the
/// final [`DeploymentResult`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRecord {
    /// Path of the file the conflict occurred on.
    pub path: PathBuf,
    /// Component the file belongs to.
    pub component: ComponentName,
    /// The strategy that was applied.
    pub strategy: ConflictStrategy,
    /// The merge strategy, if `strategy` was merge-family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_strategy: Option<MergeStrategy>,
    /// What actually happened.
    pub resolution: Resolution,
}

/// Severity of an [`ErrorRecord`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; unlikely to require action.
    Low,
    /// Worth reviewing but did not abort the deployment.
    Medium,
    /// Caused a component or file to fail.
    High,
    /// Caused the whole deployment to fail.
    Critical,
}

/// A user-visible error accumulated on a [`DeploymentResult`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    /// Stable machine-readable error code (matches `ModelError`/`DeploymentError` kinds).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Severity band.
    pub severity: Severity,
    /// Component the error occurred in, if applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentName>,
    /// File path the error occurred at, if applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    /// A suggested remediation, if one is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// A non-fatal warning accumulated on a [`DeploymentResult`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningRecord {
    /// Stable machine-readable warning code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Rollup counters and timing for one deployment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Files actually written.
    pub files_deployed: u32,
    /// Files skipped (strategy `skip`, or `dryRun`).
    pub files_skipped: u32,
    /// Conflicts that reached a non-skip, non-prompt resolution.
    pub conflicts_resolved: u32,
    /// Wall-clock duration of the deployment, in milliseconds.
    pub duration_millis: u64,
    /// Snapshot of performance-monitor metrics, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_metrics: Option<Value>,
}

/// The result of one complete (or failed) deployment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    /// Whether the deployment reached `Done` without a fatal error.
    pub success: bool,
    /// Platform this deployment targeted.
    pub platform: Platform,
    /// Components actually written.
    #[serde(default)]
    pub deployed_components: Vec<ComponentName>,
    /// Every conflict encountered and how it was resolved.
    #[serde(default)]
    pub conflicts: Vec<ConflictRecord>,
    /// Identity of the backup manifest created for this deployment, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_manifest_id: Option<Id>,
    /// Rollup counters.
    pub summary: Summary,
    /// Errors accumulated during the deployment.
    #[serde(default)]
    pub errors: Vec<ErrorRecord>,
    /// Warnings accumulated during the deployment.
    #[serde(default)]
    pub warnings: Vec<WarningRecord>,
}

impl DeploymentResult {
    /// An empty, unsuccessful result for `platform`, used as the starting
    /// accumulator before the orchestrator begins writing into it.
    #[must_use]
    pub fn empty(platform: Platform) -> Self {
        Self {
            success: false,
            platform,
            deployed_components: Vec::new(),
            conflicts: Vec::new(),
            backup_manifest_id: None,
            summary: Summary::default(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Severity/category of an [`AuditEntry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    /// Fine-grained diagnostic detail.
    Debug,
    /// Normal operational record.
    Info,
    /// Recoverable anomaly.
    Warning,
    /// Unrecoverable failure.
    Error,
    /// Security-relevant event (always surfaced regardless of log level).
    Security,
}

/// One structured audit record (§4.6, §8 Invariant 7).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Unix-millisecond timestamp.
    pub timestamp: u64,
    /// Severity/category.
    pub level: AuditLevel,
    /// High-level operation name, e.g. `"deployment"`, `"rollback"`.
    pub operation: String,
    /// Specific action within the operation, e.g. `"start"`, `"complete"`.
    pub action: String,
    /// Outcome description, e.g. `"success"`, `"failure"`.
    pub result: String,
    /// Identity of the context/config involved, if applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,
    /// Platform involved, if applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    /// Redacted snapshot of whatever context data motivated this entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    /// Diff/change summary, if applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<Value>,
    /// Security-specific detail, only present on [`AuditLevel::Security`] entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<Value>,
}
