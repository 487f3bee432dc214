//! Pure data shapes for the Backup Store (§4.3).
//!
//! The manifest format itself — file naming, directory layout, the
//! `backup_`→`manifest_` substitution — is owned by `deploy-core::backup`,
//! which is the only place that touches a filesystem. This module holds
//! only the shape that gets serialized.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ids::{ComponentName, Id, Platform};

/// One component's backup record within a [`BackupManifest`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentBackupEntry {
    /// Path the file originally lived at.
    pub original_path: PathBuf,
    /// Path the backup copy was written to.
    pub backup_path: PathBuf,
    /// Unix-millisecond backup timestamp.
    pub timestamp: u64,
    /// Other components that must be restored before this one, by name.
    #[serde(default)]
    pub dependencies: Vec<ComponentName>,
}

/// The manifest describing every file backed up during one deployment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupManifest {
    /// Manifest identity.
    pub id: Id,
    /// Unix-millisecond creation timestamp.
    pub timestamp: u64,
    /// Platform this backup was taken for.
    pub platform: Platform,
    /// Hash of the context at backup time, if computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_context_hash: Option<String>,
    /// Flat list of every backed-up path, for quick existence checks.
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Per-component backup entries, keyed by component name.
    #[serde(default)]
    pub components: BTreeMap<ComponentName, ComponentBackupEntry>,
}

impl BackupManifest {
    /// Construct an empty manifest ready to accumulate entries.
    #[must_use]
    pub fn new(platform: Platform, timestamp: u64) -> Self {
        Self {
            id: Id::generate(),
            timestamp,
            platform,
            original_context_hash: None,
            files: Vec::new(),
            components: BTreeMap::new(),
        }
    }

    /// Record a component's backup entry, adding its backup path to `files`.
    pub fn record(&mut self, component: ComponentName, entry: ComponentBackupEntry) {
        self.files.push(entry.backup_path.clone());
        self.components.insert(component, entry);
    }

    /// Dependency-ordered restore sequence for `component`, depth-first,
    /// marking each component as visited on entry so cycles terminate
    /// (§8 Invariant 3). Components absent from the manifest are skipped.
    #[must_use]
    pub fn restore_order(&self, component: &ComponentName) -> Vec<ComponentName> {
        let mut visited = std::collections::BTreeSet::new();
        let mut order = Vec::new();
        self.visit(component, &mut visited, &mut order);
        order
    }

    fn visit(
        &self,
        component: &ComponentName,
        visited: &mut std::collections::BTreeSet<ComponentName>,
        order: &mut Vec<ComponentName>,
    ) {
        if !visited.insert(component.clone()) {
            return;
        }
        if let Some(entry) = self.components.get(component) {
            for dependency in &entry.dependencies {
                self.visit(dependency, visited, order);
            }
            order.push(component.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_with(edges: &[(&str, &[&str])]) -> BackupManifest {
        let mut manifest = BackupManifest::new(Platform::ClaudeCode, 0);
        for (name, deps) in edges {
            manifest.record(
                ComponentName::from(*name),
                ComponentBackupEntry {
                    original_path: PathBuf::from(format!("/orig/{name}")),
                    backup_path: PathBuf::from(format!("/backup/{name}")),
                    timestamp: 0,
                    dependencies: deps.iter().map(|d| ComponentName::from(*d)).collect(),
                },
            );
        }
        manifest
    }

    #[test]
    fn restore_order_visits_dependencies_first() {
        let manifest = manifest_with(&[("agents", &["settings"]), ("settings", &[])]);
        let order = manifest.restore_order(&ComponentName::from("agents"));
        assert_eq!(order, vec![ComponentName::from("settings"), ComponentName::from("agents")]);
    }

    #[test]
    fn restore_order_handles_cycles_without_reentry() {
        let manifest = manifest_with(&[("a", &["b"]), ("b", &["a"])]);
        let order = manifest.restore_order(&ComponentName::from("a"));
        assert_eq!(order.len(), 2);
        assert!(order.contains(&ComponentName::from("a")));
        assert!(order.contains(&ComponentName::from("b")));
    }

    #[test]
    fn manifest_round_trips_through_json() {
        let manifest = manifest_with(&[("settings", &[])]);
        let json = serde_json::to_string(&manifest).unwrap();
        let decoded: BackupManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, manifest);
    }
}
