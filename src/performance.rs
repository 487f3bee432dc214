//! The Performance Monitor (§4.7): per-deployment/per-component timing and
//! memory snapshots, with threshold checks that produce violations but
//! never fail the deployment.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use deploy_model::ids::{ComponentName, Id};
use parking_lot::Mutex;

use crate::clock::Clock;

/// Per-deployment timing and memory threshold. 30s/deployment matches §4.7.
pub const DEPLOYMENT_THRESHOLD_MILLIS: u64 = 30_000;
/// Per-component timing threshold (§4.7).
pub const COMPONENT_THRESHOLD_MILLIS: u64 = 10_000;
/// Resident-memory threshold (§4.7).
pub const MEMORY_THRESHOLD_BYTES: u64 = 200 * 1024 * 1024;

/// One memory snapshot taken during a deployment.
///
/// `(heap_used, heap_total, rss, external)` collapses to
/// `(rss_bytes, rss_bytes, rss_bytes, 0)` for a native binary, which has no
/// separate managed-heap/external split the way a GC'd host runtime does;
/// the four-field shape is kept so this record stays compatible with the
/// rest of the reporting surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemorySnapshot {
    /// Which stage of the deployment this was sampled at.
    pub stage: String,
    /// Resident set size, reinterpreted as "heap used".
    pub heap_used: u64,
    /// Same value, reinterpreted as "heap total".
    pub heap_total: u64,
    /// Resident set size in bytes.
    pub rss: u64,
    /// Always zero; no external (off-heap) accounting exists natively.
    pub external: u64,
}

/// Accumulated timing/memory state for one deployment.
#[derive(Clone, Debug, Default)]
pub struct DeploymentTimings {
    deployment_start: Option<u64>,
    deployment_end: Option<u64>,
    component_start: BTreeMap<ComponentName, u64>,
    component_duration: BTreeMap<ComponentName, u64>,
    memory_snapshots: Vec<MemorySnapshot>,
}

/// Rollup produced by [`PerformanceMonitor::summary`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Total deployment duration in milliseconds, if ended.
    pub deployment_duration_millis: Option<u64>,
    /// Per-component durations in milliseconds.
    pub component_durations_millis: BTreeMap<ComponentName, u64>,
    /// Peak resident set size observed, in bytes.
    pub peak_rss_bytes: u64,
}

/// A threshold breach found by [`PerformanceMonitor::check_thresholds`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    /// The whole deployment exceeded [`DEPLOYMENT_THRESHOLD_MILLIS`].
    DeploymentTooSlow {
        /// Actual duration, in milliseconds.
        millis: u64,
    },
    /// A single component exceeded [`COMPONENT_THRESHOLD_MILLIS`].
    ComponentTooSlow {
        /// The component.
        component: ComponentName,
        /// Actual duration, in milliseconds.
        millis: u64,
    },
    /// A memory snapshot exceeded [`MEMORY_THRESHOLD_BYTES`].
    MemoryExceeded {
        /// The stage the snapshot was taken at.
        stage: String,
        /// Resident set size observed, in bytes.
        bytes: u64,
    },
}

/// Tracks timing and memory across potentially concurrent deployments,
/// keyed by deployment id.
pub struct PerformanceMonitor {
    clock: Arc<dyn Clock>,
    timings: Mutex<HashMap<Id, DeploymentTimings>>,
}

impl PerformanceMonitor {
    /// Construct an empty monitor.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, timings: Mutex::new(HashMap::new()) }
    }

    /// Mark the start of a deployment.
    pub fn start_deployment(&self, id: &Id) {
        let mut timings = self.timings.lock();
        timings.entry(id.clone()).or_default().deployment_start = Some(self.clock.now_millis());
    }

    /// Mark the end of a deployment, returning its duration if it was started.
    pub fn end_deployment(&self, id: &Id) -> Option<u64> {
        let now = self.clock.now_millis();
        let mut timings = self.timings.lock();
        let entry = timings.get_mut(id)?;
        entry.deployment_end = Some(now);
        Some(now.saturating_sub(entry.deployment_start.unwrap_or(now)))
    }

    /// Mark the start of a component's deployment within `id`.
    pub fn start_component(&self, id: &Id, component: &ComponentName) {
        let mut timings = self.timings.lock();
        timings.entry(id.clone()).or_default().component_start.insert(component.clone(), self.clock.now_millis());
    }

    /// Mark the end of a component's deployment, returning its duration.
    pub fn end_component(&self, id: &Id, component: &ComponentName) -> Option<u64> {
        let now = self.clock.now_millis();
        let mut timings = self.timings.lock();
        let entry = timings.get_mut(id)?;
        let started = entry.component_start.get(component).copied()?;
        let duration = now.saturating_sub(started);
        entry.component_duration.insert(component.clone(), duration);
        Some(duration)
    }

    /// Record a memory snapshot at `stage`, sampling RSS via
    /// `deploy_stream::sample_rss`.
    pub fn record_memory(&self, id: &Id, stage: &str) {
        let rss = deploy_stream::sample_rss().unwrap_or(0);
        let snapshot = MemorySnapshot { stage: stage.to_owned(), heap_used: rss, heap_total: rss, rss, external: 0 };
        self.timings.lock().entry(id.clone()).or_default().memory_snapshots.push(snapshot);
    }

    /// Roll up timing and memory for `id`. Returns `None` if `id` is unknown.
    #[must_use]
    pub fn summary(&self, id: &Id) -> Option<Summary> {
        let timings = self.timings.lock();
        let entry = timings.get(id)?;
        let deployment_duration_millis = match (entry.deployment_start, entry.deployment_end) {
            (Some(start), Some(end)) => Some(end.saturating_sub(start)),
            _ => None,
        };
        let peak_rss_bytes = entry.memory_snapshots.iter().map(|s| s.rss).max().unwrap_or(0);
        Some(Summary { deployment_duration_millis, component_durations_millis: entry.component_duration.clone(), peak_rss_bytes })
    }

    /// Check `id`'s recorded timings/memory against the fixed thresholds
    /// (§4.7). Never errors; an unknown `id` simply yields no violations.
    #[must_use]
    pub fn check_thresholds(&self, id: &Id) -> Vec<Violation> {
        let Some(summary) = self.summary(id) else { return Vec::new() };
        let mut violations = Vec::new();
        if let Some(millis) = summary.deployment_duration_millis {
            if millis > DEPLOYMENT_THRESHOLD_MILLIS {
                violations.push(Violation::DeploymentTooSlow { millis });
            }
        }
        for (component, millis) in &summary.component_durations_millis {
            if *millis > COMPONENT_THRESHOLD_MILLIS {
                violations.push(Violation::ComponentTooSlow { component: component.clone(), millis: *millis });
            }
        }
        if summary.peak_rss_bytes > MEMORY_THRESHOLD_BYTES {
            violations.push(Violation::MemoryExceeded { stage: "peak".to_owned(), bytes: summary.peak_rss_bytes });
        }
        violations
    }

    /// Render a human-readable report for `id`.
    #[must_use]
    pub fn report(&self, id: &Id) -> String {
        let Some(summary) = self.summary(id) else { return format!("no timing data for deployment {id}\n") };
        let mut out = String::new();
        out.push_str(&format!("deployment {id}:\n"));
        if let Some(millis) = summary.deployment_duration_millis {
            out.push_str(&format!("  total: {millis}ms\n"));
        }
        for (component, millis) in &summary.component_durations_millis {
            out.push_str(&format!("  component {component}: {millis}ms\n"));
        }
        out.push_str(&format!("  peak rss: {} bytes\n", summary.peak_rss_bytes));
        for violation in self.check_thresholds(id) {
            out.push_str(&format!("  VIOLATION: {violation:?}\n"));
        }
        out
    }
}
