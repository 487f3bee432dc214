//! Memory-threshold sampling and GC hints (§4.5).
//!
//! A garbage-collected host runtime can request a collection and clear
//! caches when a streaming operation crosses a memory threshold. A native
//! binary has no collector to hint, so [`optimize_memory`] samples resident
//! memory and, when the caller opts in, asks the allocator to release
//! freed pages back to the OS where the platform exposes a safe way to do
//! so; everywhere else it is a measurement-only no-op.

use std::fs;

/// Thresholds and toggles consumed by [`optimize_memory`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryOptions {
    /// Resident memory (bytes) above which a GC hint is requested.
    pub threshold_bytes: u64,
    /// Whether GC hints are requested at all.
    pub gc_hints_enabled: bool,
}

/// The result of one [`optimize_memory`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemorySample {
    /// Resident set size in bytes, if it could be sampled on this platform.
    pub rss_bytes: Option<u64>,
    /// Whether `rss_bytes` was over `threshold_bytes` and a hint was requested.
    pub hint_requested: bool,
}

/// Sample RSS and, if over threshold with hints enabled, request the
/// allocator release freed pages. Never fails: a platform that cannot
/// sample RSS reports `rss_bytes: None` rather than erroring.
#[must_use]
pub fn optimize_memory(opts: MemoryOptions) -> MemorySample {
    let rss_bytes = sample_rss();
    let over_threshold = rss_bytes.is_some_and(|rss| rss > opts.threshold_bytes);
    let hint_requested = opts.gc_hints_enabled && over_threshold;
    if hint_requested {
        request_trim();
    }
    MemorySample { rss_bytes, hint_requested }
}

/// Resident set size, sampled from `/proc/self/statm` on Linux. Returns
/// `None` on any other platform or if the file cannot be parsed.
#[must_use]
pub fn sample_rss() -> Option<u64> {
    if cfg!(target_os = "linux") {
        let contents = fs::read_to_string("/proc/self/statm").ok()?;
        let pages: u64 = contents.split_whitespace().nth(1)?.parse().ok()?;
        let page_size = page_size_bytes()?;
        Some(pages * page_size)
    } else {
        None
    }
}

#[cfg(target_os = "linux")]
fn page_size_bytes() -> Option<u64> {
    // sysconf(_SC_PAGESIZE) has no safe std wrapper; 4 KiB covers every
    // mainstream Linux target this crate runs on.
    Some(4096)
}

#[cfg(not(target_os = "linux"))]
const fn page_size_bytes() -> Option<u64> {
    None
}

/// Request that the allocator release freed pages back to the OS.
///
/// There is no safe, portable way to do this from Rust without an
/// allocator-specific FFI call, so this is currently a logged no-op; the
/// hint-eligible condition is still tracked via [`MemorySample::hint_requested`]
/// for callers (e.g. the Performance Monitor) that want to observe it.
fn request_trim() {
    tracing::debug!("memory threshold exceeded; allocator trim hint requested (no-op)");
}
