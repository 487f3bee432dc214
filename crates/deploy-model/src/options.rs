//! Closed option types for one deployment (§3, §9 Design Notes).
//!
//! The source represents these as an open, dynamically-typed bag. Here they
//! are a record type with closed sum types for each strategy, so an invalid
//! combination (e.g. `mergeStrategy` set without a merge-family
//! `conflictStrategy`) is caught at construction rather than at first use.

use serde::{Deserialize, Serialize};

use crate::ids::{ComponentName, Platform};

/// A single deployment's options.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentOptions {
    /// Selects the target writer set.
    pub platform: Platform,
    /// Components to deploy; empty means auto-detect by presence of data.
    #[serde(default)]
    pub components: Vec<ComponentName>,
    /// Components to exclude, applied after `components` resolution.
    #[serde(default)]
    pub skip_components: Vec<ComponentName>,
    /// How to resolve a conflict between new and existing content.
    #[serde(default)]
    pub conflict_strategy: ConflictStrategy,
    /// How to merge, when `conflict_strategy` is a merge-family strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_strategy: Option<MergeStrategy>,
    /// If true, no writes occur; all other side effects still occur.
    #[serde(default)]
    pub dry_run: bool,
    /// If true, halt after validation.
    #[serde(default)]
    pub validate_only: bool,
    /// If false, suppresses Backup Store interaction.
    #[serde(default = "default_true")]
    pub backup_enabled: bool,
    /// Consumed by Error Recovery: force recovery even with partial state.
    #[serde(default)]
    pub force_recovery: bool,
    /// Consumed by Error Recovery: only run cleanup, skip restore/reconcile.
    #[serde(default)]
    pub cleanup_only: bool,
    /// Streaming/memory thresholds consumed by the Large-File Streamer.
    #[serde(default)]
    pub streaming: StreamingOptions,
}

const fn default_true() -> bool {
    true
}

impl DeploymentOptions {
    /// Validate the combination of strategy fields.
    ///
    /// # Errors
    /// Returns an error if `merge_strategy` is set without a merge-family
    /// `conflict_strategy`, or vice versa.
    pub fn validate(&self) -> Result<(), OptionsError> {
        let is_merge_family = matches!(
            self.conflict_strategy,
            ConflictStrategy::Merge | ConflictStrategy::MergeIntelligent
        );
        match (is_merge_family, &self.merge_strategy) {
            (true, None) => Err(OptionsError::MissingMergeStrategy),
            (false, Some(_)) => Err(OptionsError::UnexpectedMergeStrategy),
            _ => Ok(()),
        }
    }

    /// Resolve the effective component set: explicit `components` minus
    /// `skip_components`, or, if `components` is empty, `detected` minus
    /// `skip_components`.
    #[must_use]
    pub fn resolve_components(&self, detected: &[ComponentName]) -> Vec<ComponentName> {
        let base: Vec<ComponentName> = if self.components.is_empty() {
            detected.to_vec()
        } else {
            self.components.clone()
        };
        base.into_iter()
            .filter(|c| !self.skip_components.contains(c))
            .collect()
    }
}

/// Error produced by [`DeploymentOptions::validate`].
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    /// A merge-family `conflict_strategy` was selected without a `merge_strategy`.
    #[error("conflictStrategy is a merge strategy but no mergeStrategy was provided")]
    MissingMergeStrategy,
    /// A `merge_strategy` was provided but `conflict_strategy` is not merge-family.
    #[error("mergeStrategy was provided but conflictStrategy is not a merge strategy")]
    UnexpectedMergeStrategy,
}

/// Named policy for resolving a conflict between new and existing content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictStrategy {
    /// Do not write; record a warning.
    #[default]
    Skip,
    /// Write new content verbatim.
    Overwrite,
    /// Dispatch to a merge strategy.
    Merge,
    /// Copy existing content aside, then overwrite.
    Backup,
    /// Defer to the (out-of-scope) interactive resolver.
    Prompt,
    /// Markdown-only: carry forward checked task state.
    PreserveTasks,
    /// Dispatch to a merge strategy, choosing array semantics per §4.4.
    MergeIntelligent,
}

/// Parameterizes a merge-family `ConflictStrategy`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// Recursive object merge; arrays merge by id or set-union.
    DeepMerge,
    /// Deep merge plus deduplicated array union at every array field.
    ArrayAppend,
    /// Markdown heading-keyed section merge.
    MarkdownSectionMerge,
    /// Markdown task-status preservation.
    TaskStatusPreserve,
}

/// Thresholds consumed by the Large-File Streamer.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingOptions {
    /// Files at or above this size (bytes) are treated as large.
    pub large_file_threshold_bytes: u64,
    /// Chunk size (bytes) used when streaming a large file.
    pub chunk_size_bytes: u64,
    /// Resident memory (bytes) above which a GC hint is requested.
    pub memory_threshold_bytes: u64,
    /// Whether to request allocator GC hints when over threshold.
    pub gc_hints_enabled: bool,
}

impl Default for StreamingOptions {
    fn default() -> Self {
        Self {
            large_file_threshold_bytes: 10 * 1024 * 1024,
            chunk_size_bytes: 2 * 1024 * 1024,
            memory_threshold_bytes: 200 * 1024 * 1024,
            gc_hints_enabled: true,
        }
    }
}
