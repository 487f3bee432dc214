//! Reverse-Conversion Metadata (§9.17 OQ-3): records the forward
//! transformation for later change detection.
//!
//! Schema migration of target IDEs is explicitly out of scope (§1); only a
//! stubbed version comparison is provided.

use std::collections::BTreeMap;
use std::path::PathBuf;

use deploy_model::ids::{ComponentName, Id, Platform};
use serde::{Deserialize, Serialize};

/// One persisted record of a forward transformation, written once per
/// successful deployment to `reverse-conversion/<metadataId>.json` (§6).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseConversionMetadata {
    /// Identity of this metadata record.
    pub id: Id,
    /// Platform the deployment targeted.
    pub platform: Platform,
    /// Hash of the source context at the time of deployment.
    pub context_hash: String,
    /// Which on-disk files each component produced.
    pub component_mappings: BTreeMap<ComponentName, Vec<PathBuf>>,
    /// Unix-millisecond creation timestamp.
    pub created_at: u64,
}

impl ReverseConversionMetadata {
    /// Construct a fresh record.
    #[must_use]
    pub fn new(platform: Platform, context_hash: String, created_at: u64) -> Self {
        Self { id: Id::generate(), platform, context_hash, component_mappings: BTreeMap::new(), created_at }
    }

    /// Record which files a component produced.
    pub fn record_component(&mut self, component: ComponentName, files: Vec<PathBuf>) {
        self.component_mappings.insert(component, files);
    }
}

/// Outcome of [`compare_versions`]: a stub that only distinguishes whether
/// the context has changed since the recorded metadata, never attempting
/// schema migration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VersionComparison {
    /// `new_hash` matches the recorded `context_hash`.
    Unchanged,
    /// `new_hash` differs from the recorded `context_hash`.
    Changed,
    /// No prior metadata to compare against.
    Unknown,
}

/// Compare `new_hash` against `previous`'s recorded context hash.
#[must_use]
pub fn compare_versions(previous: Option<&ReverseConversionMetadata>, new_hash: &str) -> VersionComparison {
    match previous {
        None => VersionComparison::Unknown,
        Some(metadata) if metadata.context_hash == new_hash => VersionComparison::Unchanged,
        Some(_) => VersionComparison::Changed,
    }
}
