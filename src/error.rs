//! The unified error type for the deployment core.
//!
//! Mirrors the taxonomy in §7: each variant is self-contained enough that
//! a caller (or an agent acting on its behalf) can act on it without extra
//! context. `PromptRequired` is deliberately **not** a variant here — a
//! deployment that needs interactive resolution is represented as
//! `Ok(Resolution::PromptRequired)` on the conflict record, not as an
//! error, since it is expected control flow rather than failure.

use std::fmt;
use std::path::PathBuf;

use deploy_model::ids::ComponentName;

/// Unified error type for deployment-core operations.
#[derive(Debug)]
pub enum DeploymentError {
    /// The platform-scoped lock could not be acquired.
    LockUnavailable {
        /// Path to the lock file.
        path: PathBuf,
        /// Why acquisition failed.
        reason: String,
    },

    /// The external validator rejected the context/options pair.
    ValidationFailed {
        /// Validator-supplied messages.
        messages: Vec<String>,
    },

    /// The external transformer failed to produce a target artifact set.
    TransformationFailed {
        /// Human-readable description of the failure.
        detail: String,
    },

    /// A backup copy could not be written.
    BackupWriteFailed {
        /// Path the backup was being written to.
        path: PathBuf,
        /// Underlying cause.
        detail: String,
    },

    /// A backup file could not be read back during restore.
    BackupReadFailed {
        /// Path the backup was being read from.
        path: PathBuf,
        /// Underlying cause.
        detail: String,
    },

    /// A manifest file could not be parsed.
    ManifestParseFailed {
        /// Path to the manifest.
        path: PathBuf,
        /// Underlying cause.
        detail: String,
    },

    /// `rollbackComponent`/`rollbackWithDependencies` named a component the
    /// manifest does not know about.
    ComponentNotInManifest {
        /// The component that was requested.
        component: ComponentName,
    },

    /// A conflict could not be resolved by any available strategy.
    ConflictUnresolvable {
        /// Path of the file in conflict.
        path: PathBuf,
        /// Why no strategy applied.
        reason: String,
    },

    /// The requested merge strategy does not apply to this artifact's type.
    MergeIncompatible {
        /// Path of the file.
        path: PathBuf,
        /// Why the merge strategy is incompatible.
        reason: String,
    },

    /// A target write failed.
    WriteFailed {
        /// Path that failed to write.
        path: PathBuf,
        /// Underlying cause.
        detail: String,
    },

    /// A post-write integrity check failed.
    ChecksumMismatch {
        /// Path whose content did not match its expected checksum.
        path: PathBuf,
    },

    /// A redaction or secret-handling rule was violated; always fatal,
    /// never silently recovered (§7).
    SecurityViolation {
        /// Human-readable description of the violation.
        detail: String,
    },

    /// An invariant the implementation assumes always holds was broken.
    /// Never expected in correct operation.
    InternalInvariant {
        /// Human-readable description of what was violated.
        detail: String,
    },

    /// A model-level (pure data) error propagated from `deploy-model`.
    Model(deploy_model::ModelError),

    /// A filesystem-level error propagated from `deploy-fs`.
    Fs(deploy_fs::FsError),

    /// A streaming error propagated from `deploy-stream`.
    Stream(deploy_stream::StreamError),
}

impl fmt::Display for DeploymentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LockUnavailable { path, reason } => write!(
                f,
                "could not acquire lock at '{}': {reason}\n  To fix: wait for the other process to finish, or run cleanupStaleLocks if it crashed.",
                path.display()
            ),
            Self::ValidationFailed { messages } => {
                write!(f, "validation failed:")?;
                for m in messages {
                    write!(f, "\n  - {m}")?;
                }
                write!(f, "\n  To fix: correct the reported issues and retry, or pass forceRecovery to proceed anyway.")
            }
            Self::TransformationFailed { detail } => write!(
                f,
                "transformation failed: {detail}\n  To fix: check the context for malformed or missing fields the transformer requires."
            ),
            Self::BackupWriteFailed { path, detail } => write!(
                f,
                "failed to write backup for '{}': {detail}\n  To fix: check disk space and permissions on the backup directory.",
                path.display()
            ),
            Self::BackupReadFailed { path, detail } => write!(
                f,
                "failed to read backup '{}': {detail}\n  To fix: check that the backup file was not moved or deleted out of band.",
                path.display()
            ),
            Self::ManifestParseFailed { path, detail } => write!(
                f,
                "failed to parse manifest '{}': {detail}\n  To fix: the manifest may be corrupted; restore individual files with rollbackComponent instead.",
                path.display()
            ),
            Self::ComponentNotInManifest { component } => write!(
                f,
                "component '{component}' is not present in the manifest.\n  To fix: check the manifest's components map for the correct name."
            ),
            Self::ConflictUnresolvable { path, reason } => write!(
                f,
                "conflict at '{}' could not be resolved: {reason}\n  To fix: choose a different conflictStrategy or resolve the file manually.",
                path.display()
            ),
            Self::MergeIncompatible { path, reason } => write!(
                f,
                "merge strategy incompatible with '{}': {reason}\n  To fix: choose a mergeStrategy that matches the artifact's type.",
                path.display()
            ),
            Self::WriteFailed { path, detail } => write!(
                f,
                "failed to write '{}': {detail}\n  To fix: check disk space and permissions on the target path.",
                path.display()
            ),
            Self::ChecksumMismatch { path } => write!(
                f,
                "checksum mismatch after writing '{}'.\n  To fix: retry the deployment; if this persists, check for concurrent writers.",
                path.display()
            ),
            Self::SecurityViolation { detail } => write!(
                f,
                "security violation: {detail}\n  This is always fatal; no target write was attempted."
            ),
            Self::InternalInvariant { detail } => write!(
                f,
                "internal invariant violated: {detail}\n  This should never happen in correct operation; please report it."
            ),
            Self::Model(err) => write!(f, "{err}"),
            Self::Fs(err) => write!(f, "{err}"),
            Self::Stream(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DeploymentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Model(err) => Some(err),
            Self::Fs(err) => Some(err),
            Self::Stream(err) => Some(err),
            _ => None,
        }
    }
}

impl From<deploy_model::ModelError> for DeploymentError {
    fn from(err: deploy_model::ModelError) -> Self {
        Self::Model(err)
    }
}

impl From<deploy_fs::FsError> for DeploymentError {
    fn from(err: deploy_fs::FsError) -> Self {
        Self::Fs(err)
    }
}

impl From<deploy_stream::StreamError> for DeploymentError {
    fn from(err: deploy_stream::StreamError) -> Self {
        Self::Stream(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lock_unavailable() {
        let err = DeploymentError::LockUnavailable {
            path: PathBuf::from("/home/.taptik/settings.json.lock"),
            reason: "already held by pid 42".to_owned(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("settings.json.lock"));
        assert!(msg.contains("cleanupStaleLocks"));
    }

    #[test]
    fn display_component_not_in_manifest() {
        let err = DeploymentError::ComponentNotInManifest { component: ComponentName::from("hooks") };
        assert!(format!("{err}").contains("hooks"));
    }

    #[test]
    fn source_delegates_to_wrapped_fs_error() {
        let err = DeploymentError::Fs(deploy_fs::FsError::NotFound(PathBuf::from("/x")));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn source_is_none_for_leaf_variants() {
        let err = DeploymentError::SecurityViolation { detail: "leaked token".to_owned() };
        assert!(std::error::Error::source(&err).is_none());
    }
}
