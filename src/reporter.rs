//! The Reporter (§9.17 OQ-2): summary, analysis, and recommendations
//! derived from a completed [`DeploymentResult`].
//!
//! No external I/O of its own: formatting to JSON/Markdown text is a thin
//! serialization step, callable by the out-of-scope CLI that owns the
//! `reports/` directory (§6).

use deploy_model::result::{DeploymentResult, Severity};

/// A summary, warnings digest, and recommendations derived from one
/// completed deployment.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Short, human-readable highlights (counts, success/failure).
    pub highlights: Vec<String>,
    /// One line per warning, condensed from `DeploymentResult.warnings`.
    pub warnings_digest: Vec<String>,
    /// Deterministic suggestions derived from the result's shape.
    pub recommendations: Vec<String>,
}

/// Produces a [`Report`] from a finished [`DeploymentResult`].
pub struct Reporter;

impl Reporter {
    /// Summarize `result` into highlights, a warnings digest, and
    /// recommendations.
    #[must_use]
    pub fn summarize(result: &DeploymentResult) -> Report {
        let highlights = build_highlights(result);
        let warnings_digest = result.warnings.iter().map(|w| format!("[{}] {}", w.code, w.message)).collect();
        let recommendations = build_recommendations(result);
        Report { highlights, warnings_digest, recommendations }
    }
}

fn build_highlights(result: &DeploymentResult) -> Vec<String> {
    vec![
        format!("platform: {}", result.platform),
        format!("success: {}", result.success),
        format!("files deployed: {}", result.summary.files_deployed),
        format!("files skipped: {}", result.summary.files_skipped),
        format!("conflicts resolved: {}", result.summary.conflicts_resolved),
        format!("duration: {}ms", result.summary.duration_millis),
    ]
}

fn build_recommendations(result: &DeploymentResult) -> Vec<String> {
    let mut out = Vec::new();

    if result.summary.files_deployed > 0 && result.summary.conflicts_resolved > result.summary.files_deployed / 2 {
        out.push("more than half of deployed files required conflict resolution; consider reviewing conflictStrategy".to_owned());
    }

    if result.errors.iter().any(|e| e.severity == Severity::Critical) {
        out.push("a critical error occurred; manually verify the backup manifest before retrying".to_owned());
    }

    if !result.success && result.conflicts.is_empty() && result.errors.is_empty() {
        out.push("deployment failed with no recorded conflicts or errors; check orchestrator logs for a lock or validation failure"
            .to_owned());
    }

    if result.summary.files_skipped > 0 {
        out.push(format!("{} file(s) were skipped; rerun with a non-skip conflictStrategy to apply them", result.summary.files_skipped));
    }

    out
}

impl Report {
    /// Serialize to JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Render as Markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Deployment Report\n\n## Highlights\n");
        for line in &self.highlights {
            out.push_str(&format!("- {line}\n"));
        }
        if !self.warnings_digest.is_empty() {
            out.push_str("\n## Warnings\n");
            for line in &self.warnings_digest {
                out.push_str(&format!("- {line}\n"));
            }
        }
        if !self.recommendations.is_empty() {
            out.push_str("\n## Recommendations\n");
            for line in &self.recommendations {
                out.push_str(&format!("- {line}\n"));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use deploy_model::ids::Platform;
    use deploy_model::result::{ErrorRecord, Summary, WarningRecord};

    use super::*;

    #[test]
    fn recommends_reviewing_strategy_when_conflicts_dominate() {
        let mut result = DeploymentResult::empty(Platform::Cursor);
        result.success = true;
        result.summary = Summary { files_deployed: 4, conflicts_resolved: 3, ..Summary::default() };
        let report = Reporter::summarize(&result);
        assert!(report.recommendations.iter().any(|r| r.contains("conflictStrategy")));
    }

    #[test]
    fn recommends_verification_after_critical_error() {
        let mut result = DeploymentResult::empty(Platform::Cursor);
        result.errors.push(ErrorRecord {
            code: "backup-write-failed".to_owned(),
            message: "disk full".to_owned(),
            severity: Severity::Critical,
            component: None,
            file_path: None,
            suggestion: None,
        });
        let report = Reporter::summarize(&result);
        assert!(report.recommendations.iter().any(|r| r.contains("backup manifest")));
    }

    #[test]
    fn to_markdown_includes_all_sections() {
        let mut result = DeploymentResult::empty(Platform::Cursor);
        result.warnings.push(WarningRecord { code: "skip".to_owned(), message: "skipped a file".to_owned() });
        result.summary.files_skipped = 1;
        let report = Reporter::summarize(&result);
        let markdown = report.to_markdown();
        assert!(markdown.contains("## Highlights"));
        assert!(markdown.contains("## Warnings"));
        assert!(markdown.contains("## Recommendations"));
    }
}
