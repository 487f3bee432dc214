//! Data model, diff engine, and closed strategy/error types for the
//! deployment core.
//!
//! Nothing in this crate touches a filesystem or a clock: every type is
//! plain data, and every function (`diff`, `merge`, `get_conflicts`,
//! `apply_patch`) is pure. `deploy-core` owns the state machine that drives
//! these types against the real world; `deploy-fs` owns the filesystem
//! abstraction.

pub mod artifact;
pub mod backup;
pub mod context;
pub mod diff;
pub mod error;
pub mod ids;
pub mod lock;
pub mod options;
pub mod result;

pub use artifact::{ArtifactContent, ArtifactType, TargetArtifact};
pub use backup::{BackupManifest, ComponentBackupEntry};
pub use context::Context;
pub use diff::{apply_patch, array_merge, deep_merge, diff, format_diff, get_conflicts, merge};
pub use diff::{ConflictKind, DiffEntry, DiffKind, DiffResult, MergeMode, ValueConflict};
pub use error::ModelError;
pub use ids::{ComponentName, Id, IdError, Platform};
pub use lock::LockHandle;
pub use options::{ConflictStrategy, DeploymentOptions, MergeStrategy, OptionsError, StreamingOptions};
pub use result::{
    AuditEntry, AuditLevel, ConflictRecord, DeploymentResult, ErrorRecord, Resolution, Severity,
    Summary, WarningRecord,
};
