//! The Conflict Resolver (§4.4): detection, per-strategy resolution, and
//! strategy suggestion for a single target artifact.
//!
//! Markdown is parsed with a small line-oriented ATX-heading scanner rather
//! than a CommonMark crate, since the contract here only needs heading-keyed
//! body replacement and task-list scanning (§4.4.1).

use std::path::{Path, PathBuf};

use deploy_model::diff::{get_conflicts, ConflictKind as DiffConflictKind};
use deploy_model::ids::ComponentName;
use deploy_model::options::{ConflictStrategy, MergeStrategy};
use deploy_model::result::Resolution;

use crate::error::DeploymentError;

/// One detected disagreement between existing and new content.
#[derive(Clone, Debug, PartialEq)]
pub struct ConflictDetail {
    /// What kind of disagreement this is.
    pub kind: ConflictDetailKind,
    /// Human-readable description (e.g. the differing section heading).
    pub detail: String,
}

/// Kinds of conflict [`detect_conflicts`] can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictDetailKind {
    /// Byte content differs and no finer-grained classification applies.
    ContentDiffers,
    /// Both sides carry a `version` field and it differs.
    VersionConflict,
    /// Top-level keys were added/removed, or one side failed to parse.
    StructureMismatch,
}

/// Outcome of [`resolve`]: what was written (if anything) and how.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolutionOutcome {
    /// The resolution that applied.
    pub resolution: Resolution,
    /// The bytes that should be written to `path`, if any.
    pub content: Option<Vec<u8>>,
    /// Path the pre-existing content was copied to, for `Resolution::BackedUp`.
    pub backup_path: Option<PathBuf>,
}

/// A deterministic strategy suggestion from [`suggest_strategy`].
#[derive(Clone, Debug, PartialEq)]
pub struct StrategySuggestion {
    /// The suggested conflict strategy.
    pub strategy: ConflictStrategy,
    /// The accompanying merge strategy, if `strategy` is merge-family.
    pub merge_strategy: Option<MergeStrategy>,
    /// Why this strategy was suggested.
    pub reasoning: String,
}

/// Outcome of [`validate_merge_compatibility`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeCompatibility {
    /// Whether the merge strategy applies to this artifact's type.
    pub compatible: bool,
    /// Why not, if `compatible` is false.
    pub reason: Option<String>,
}

/// Detect conflicts between `existing` and `new_content` at `path` (§4.4).
///
/// `existing` is `None` when the target file does not yet exist, which is
/// never a conflict.
#[must_use]
pub fn detect_conflicts(path: &Path, existing: Option<&[u8]>, new_content: &[u8]) -> Vec<ConflictDetail> {
    let Some(existing) = existing else { return Vec::new() };
    if existing == new_content {
        return Vec::new();
    }

    if is_json_path(path) {
        return detect_json_conflicts(existing, new_content);
    }
    if is_markdown_path(path) {
        return detect_markdown_conflicts(existing, new_content);
    }

    vec![ConflictDetail { kind: ConflictDetailKind::ContentDiffers, detail: "byte content differs".to_owned() }]
}

fn is_json_path(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

fn is_markdown_path(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("md" | "markdown"))
}

fn detect_json_conflicts(existing: &[u8], new_content: &[u8]) -> Vec<ConflictDetail> {
    let (existing_value, new_value) = match (
        serde_json::from_slice::<serde_json::Value>(existing),
        serde_json::from_slice::<serde_json::Value>(new_content),
    ) {
        (Ok(e), Ok(n)) => (e, n),
        _ => {
            return vec![ConflictDetail {
                kind: ConflictDetailKind::StructureMismatch,
                detail: "one side failed to parse as JSON".to_owned(),
            }]
        }
    };

    let mut out = vec![ConflictDetail { kind: ConflictDetailKind::ContentDiffers, detail: "content differs".to_owned() }];

    if let (Some(existing_version), Some(new_version)) = (existing_value.get("version"), new_value.get("version")) {
        if existing_version != new_version {
            out.push(ConflictDetail {
                kind: ConflictDetailKind::VersionConflict,
                detail: format!("version {existing_version} != {new_version}"),
            });
        }
    }

    if let (Some(existing_obj), Some(new_obj)) = (existing_value.as_object(), new_value.as_object()) {
        let existing_keys: std::collections::BTreeSet<_> = existing_obj.keys().collect();
        let new_keys: std::collections::BTreeSet<_> = new_obj.keys().collect();
        if existing_keys != new_keys {
            out.push(ConflictDetail {
                kind: ConflictDetailKind::StructureMismatch,
                detail: "top-level keys were added or removed".to_owned(),
            });
        }
    }

    out
}

fn detect_markdown_conflicts(existing: &[u8], new_content: &[u8]) -> Vec<ConflictDetail> {
    let existing_sections = parse_sections(&String::from_utf8_lossy(existing));
    let new_sections = parse_sections(&String::from_utf8_lossy(new_content));

    let mut out = Vec::new();
    for new_section in &new_sections {
        if let Some(existing_section) = existing_sections.iter().find(|s| s.heading == new_section.heading) {
            if existing_section.body != new_section.body {
                out.push(ConflictDetail {
                    kind: ConflictDetailKind::ContentDiffers,
                    detail: format!("section '{}' differs", new_section.heading),
                });
            }
        }
    }
    if out.is_empty() {
        out.push(ConflictDetail { kind: ConflictDetailKind::ContentDiffers, detail: "content differs".to_owned() });
    }
    out
}

// ---------------------------------------------------------------------------
// Markdown section model (§4.4.1)
// ---------------------------------------------------------------------------

/// One heading-delimited section of a Markdown document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    /// The heading text, without leading `#` markers.
    pub heading: String,
    /// Heading level, 1-6.
    pub level: u8,
    /// Everything between this heading and the next (or end of document).
    pub body: String,
}

/// Parse `text` into an ordered list of ATX-heading-delimited sections.
///
/// Content before the first heading is captured as a section with an empty
/// heading and level 0, so no text is ever dropped.
#[must_use]
pub fn parse_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current_heading = String::new();
    let mut current_level = 0u8;
    let mut current_body = String::new();

    for line in text.lines() {
        if let Some((level, heading)) = parse_atx_heading(line) {
            sections.push(Section { heading: current_heading.clone(), level: current_level, body: current_body.clone() });
            current_heading = heading;
            current_level = level;
            current_body.clear();
        } else {
            current_body.push_str(line);
            current_body.push('\n');
        }
    }
    sections.push(Section { heading: current_heading, level: current_level, body: current_body });
    sections.into_iter().filter(|s| !(s.heading.is_empty() && s.level == 0 && s.body.trim().is_empty())).collect()
}

fn parse_atx_heading(line: &str) -> Option<(u8, String)> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !rest.starts_with(' ') && !rest.is_empty() {
        return None;
    }
    Some((hashes as u8, rest.trim().to_owned()))
}

/// Re-render a section list back to Markdown text, in order.
#[must_use]
pub fn render_sections(sections: &[Section]) -> String {
    let mut out = String::new();
    for section in sections {
        if !section.heading.is_empty() || section.level > 0 {
            out.push_str(&"#".repeat(section.level as usize));
            out.push(' ');
            out.push_str(&section.heading);
            out.push('\n');
        }
        out.push_str(&section.body);
    }
    out
}

/// A single checkbox task-list line.
#[derive(Clone, Debug, PartialEq, Eq)]
struct TaskLine {
    checked: bool,
    identifier: String,
    raw: String,
}

fn parse_task_line(line: &str) -> Option<TaskLine> {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix("- [")?;
    let mut chars = rest.chars();
    let mark = chars.next()?;
    if !matches!(mark, ' ' | 'x' | 'X') {
        return None;
    }
    let rest = chars.as_str().strip_prefix(']')?;
    let text = rest.trim_start();
    Some(TaskLine { checked: mark == 'x' || mark == 'X', identifier: task_identifier(text), raw: line.to_owned() })
}

fn task_identifier(text: &str) -> String {
    let leading_numeric: String = text.chars().take_while(|c| c.is_ascii_digit() || *c == '.').collect();
    let candidate = if leading_numeric.trim_matches('.').is_empty() {
        text.split_whitespace().take(3).collect::<Vec<_>>().join(" ")
    } else {
        leading_numeric
    };
    candidate.to_lowercase()
}

/// Apply task-status preservation (§4.4): any task in `new_content` whose
/// identifier matches a checked task in `existing` is marked checked.
#[must_use]
pub fn preserve_task_status(existing: &str, new_content: &str) -> String {
    let checked_ids: std::collections::BTreeSet<String> = existing
        .lines()
        .filter_map(parse_task_line)
        .filter(|t| t.checked)
        .map(|t| t.identifier)
        .collect();

    new_content
        .lines()
        .map(|line| match parse_task_line(line) {
            Some(task) if !task.checked && checked_ids.contains(&task.identifier) => mark_checked(&task.raw),
            _ => line.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("\n")
        + if new_content.ends_with('\n') { "\n" } else { "" }
}

fn mark_checked(line: &str) -> String {
    line.replacen("[ ]", "[x]", 1)
}

/// Merge two Markdown documents by heading (§4.4): each new section replaces
/// the existing body unless both sides are task lists, in which case
/// task-status preservation applies.
#[must_use]
pub fn merge_markdown_sections(existing: &str, new_content: &str) -> String {
    let existing_sections = parse_sections(existing);
    let new_sections = parse_sections(new_content);

    let merged: Vec<Section> = new_sections
        .into_iter()
        .map(|new_section| {
            let Some(existing_section) = existing_sections.iter().find(|s| s.heading == new_section.heading) else {
                return new_section;
            };
            let both_task_lists = existing_section.body.lines().any(|l| parse_task_line(l).is_some())
                && new_section.body.lines().any(|l| parse_task_line(l).is_some());
            if both_task_lists {
                Section { body: preserve_task_status(&existing_section.body, &new_section.body), ..new_section }
            } else {
                new_section
            }
        })
        .collect();

    render_sections(&merged)
}

// ---------------------------------------------------------------------------
// resolve
// ---------------------------------------------------------------------------

/// Resolve a conflict at `path` per `strategy` (and `merge_strategy`, for
/// merge-family strategies).
///
/// `existing` is `None` when the target does not yet exist (callers should
/// not invoke this without first confirming a conflict via
/// [`detect_conflicts`], but an absent target degrades to `Overwritten`
/// rather than erroring).
///
/// # Errors
/// Returns [`DeploymentError::MergeIncompatible`] if `merge_strategy` does
/// not apply to the artifact type at `path`.
pub fn resolve(
    path: &Path,
    existing: Option<&[u8]>,
    new_content: &[u8],
    strategy: ConflictStrategy,
    merge_strategy: Option<MergeStrategy>,
) -> Result<ResolutionOutcome, DeploymentError> {
    match strategy {
        ConflictStrategy::Skip => Ok(ResolutionOutcome { resolution: Resolution::Skipped, content: None, backup_path: None }),
        ConflictStrategy::Overwrite => {
            Ok(ResolutionOutcome { resolution: Resolution::Overwritten, content: Some(new_content.to_vec()), backup_path: None })
        }
        ConflictStrategy::Backup => {
            let backup_path = existing.map(|_| backup_sibling_path(path));
            Ok(ResolutionOutcome { resolution: Resolution::BackedUp, content: Some(new_content.to_vec()), backup_path })
        }
        ConflictStrategy::Merge | ConflictStrategy::MergeIntelligent => {
            resolve_merge(path, existing, new_content, merge_strategy)
        }
        ConflictStrategy::PreserveTasks => {
            if !is_markdown_path(path) {
                return Err(DeploymentError::MergeIncompatible {
                    path: path.to_path_buf(),
                    reason: "preserve-tasks only applies to Markdown artifacts".to_owned(),
                });
            }
            let merged = match existing {
                Some(existing) => preserve_task_status(&String::from_utf8_lossy(existing), &String::from_utf8_lossy(new_content)),
                None => String::from_utf8_lossy(new_content).into_owned(),
            };
            Ok(ResolutionOutcome { resolution: Resolution::TasksPreserved, content: Some(merged.into_bytes()), backup_path: None })
        }
        ConflictStrategy::Prompt => {
            Ok(ResolutionOutcome { resolution: Resolution::PromptRequired, content: None, backup_path: None })
        }
    }
}

fn resolve_merge(
    path: &Path,
    existing: Option<&[u8]>,
    new_content: &[u8],
    merge_strategy: Option<MergeStrategy>,
) -> Result<ResolutionOutcome, DeploymentError> {
    let Some(existing) = existing else {
        return Ok(ResolutionOutcome { resolution: Resolution::Overwritten, content: Some(new_content.to_vec()), backup_path: None });
    };
    let merge_strategy = merge_strategy.ok_or_else(|| DeploymentError::MergeIncompatible {
        path: path.to_path_buf(),
        reason: "merge strategy required for merge-family conflict strategy".to_owned(),
    })?;

    match merge_strategy {
        MergeStrategy::DeepMerge | MergeStrategy::ArrayAppend => {
            if !is_json_path(path) {
                return Err(DeploymentError::MergeIncompatible {
                    path: path.to_path_buf(),
                    reason: format!("{merge_strategy:?} only applies to JSON artifacts"),
                });
            }
            let existing_value: serde_json::Value = serde_json::from_slice(existing)
                .map_err(|e| DeploymentError::MergeIncompatible { path: path.to_path_buf(), reason: e.to_string() })?;
            let new_value: serde_json::Value = serde_json::from_slice(new_content)
                .map_err(|e| DeploymentError::MergeIncompatible { path: path.to_path_buf(), reason: e.to_string() })?;
            let merged = deploy_model::diff::deep_merge(&existing_value, &new_value);
            let bytes = serde_json::to_vec_pretty(&merged).unwrap_or_default();
            Ok(ResolutionOutcome { resolution: Resolution::Merged, content: Some(bytes), backup_path: None })
        }
        MergeStrategy::MarkdownSectionMerge => {
            if !is_markdown_path(path) {
                return Err(DeploymentError::MergeIncompatible {
                    path: path.to_path_buf(),
                    reason: "markdown-section-merge only applies to Markdown artifacts".to_owned(),
                });
            }
            let merged = merge_markdown_sections(&String::from_utf8_lossy(existing), &String::from_utf8_lossy(new_content));
            Ok(ResolutionOutcome { resolution: Resolution::Merged, content: Some(merged.into_bytes()), backup_path: None })
        }
        MergeStrategy::TaskStatusPreserve => {
            if !is_markdown_path(path) {
                return Err(DeploymentError::MergeIncompatible {
                    path: path.to_path_buf(),
                    reason: "task-status-preserve only applies to Markdown artifacts".to_owned(),
                });
            }
            let merged = preserve_task_status(&String::from_utf8_lossy(existing), &String::from_utf8_lossy(new_content));
            Ok(ResolutionOutcome { resolution: Resolution::TasksPreserved, content: Some(merged.into_bytes()), backup_path: None })
        }
    }
}

fn backup_sibling_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".backup");
    PathBuf::from(name)
}

/// Suggest a strategy for `component` given its detected conflicts (§4.4).
///
/// Deterministic by component kind; conflict details are only used to
/// tailor the reasoning string, not the decision.
#[must_use]
pub fn suggest_strategy(conflicts: &[ConflictDetail], component: &ComponentName) -> StrategySuggestion {
    let name = component.0.as_str();
    let (strategy, merge_strategy, rationale) = match name {
        "settings" => (ConflictStrategy::MergeIntelligent, Some(MergeStrategy::DeepMerge), "settings merge cleanly key-wise"),
        "specs" => (ConflictStrategy::PreserveTasks, None, "specs carry task checklists worth preserving"),
        "hooks" => (ConflictStrategy::Prompt, None, "hook scripts can have side effects; ask before overwriting"),
        "agents" => (ConflictStrategy::Backup, None, "agent definitions are replaced wholesale but kept recoverable"),
        "templates" => {
            (ConflictStrategy::MergeIntelligent, Some(MergeStrategy::ArrayAppend), "template lists should grow, not replace")
        }
        "steering" => (
            ConflictStrategy::MergeIntelligent,
            Some(MergeStrategy::MarkdownSectionMerge),
            "steering documents merge section-by-section",
        ),
        _ => (ConflictStrategy::Backup, None, "no specific policy for this component; default to a safe backup"),
    };

    let reasoning = if conflicts.is_empty() {
        rationale.to_owned()
    } else {
        format!("{rationale} ({} conflict(s) detected)", conflicts.len())
    };

    StrategySuggestion { strategy, merge_strategy, reasoning }
}

/// Whether `merge_strategy` applies to the artifact type at `path` (§4.4).
#[must_use]
pub fn validate_merge_compatibility(path: &Path, merge_strategy: MergeStrategy) -> MergeCompatibility {
    let json_only = matches!(merge_strategy, MergeStrategy::DeepMerge | MergeStrategy::ArrayAppend);
    let markdown_only = matches!(merge_strategy, MergeStrategy::MarkdownSectionMerge | MergeStrategy::TaskStatusPreserve);

    if json_only && !is_json_path(path) {
        return MergeCompatibility { compatible: false, reason: Some(format!("{merge_strategy:?} requires a JSON artifact")) };
    }
    if markdown_only && !is_markdown_path(path) {
        return MergeCompatibility { compatible: false, reason: Some(format!("{merge_strategy:?} requires a Markdown artifact")) };
    }
    MergeCompatibility { compatible: true, reason: None }
}

/// Render a grouped, deterministic report of conflicts, using the same
/// visual shape as the Diff Engine's `format_diff` (§4.4.1, §4.1).
#[must_use]
pub fn generate_report(conflicts: &[(PathBuf, ConflictDetail)]) -> String {
    if conflicts.is_empty() {
        return "No conflicts.\n".to_owned();
    }
    let mut by_kind: std::collections::BTreeMap<&str, Vec<&(PathBuf, ConflictDetail)>> = std::collections::BTreeMap::new();
    for entry in conflicts {
        let key = match entry.1.kind {
            ConflictDetailKind::ContentDiffers => "Content differs",
            ConflictDetailKind::VersionConflict => "Version conflicts",
            ConflictDetailKind::StructureMismatch => "Structure mismatches",
        };
        by_kind.entry(key).or_default().push(entry);
    }
    let mut out = String::new();
    for (title, entries) in by_kind {
        out.push_str(title);
        out.push_str(":\n");
        let mut sorted = entries;
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        for (path, detail) in sorted {
            out.push_str(&format!("  - {}: {}\n", path.display(), detail.detail));
        }
    }
    out
}

/// Find genuine value/type conflicts between two JSON trees, delegating to
/// the Diff Engine's narrower common-keys walk (§4.1).
#[must_use]
pub fn json_value_conflicts(source: &serde_json::Value, target: &serde_json::Value) -> Vec<(String, DiffConflictKind)> {
    get_conflicts(source, target).into_iter().map(|c| (c.path, c.kind)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_conflicts_is_empty_when_target_absent() {
        assert!(detect_conflicts(Path::new("/x.json"), None, b"{}").is_empty());
    }

    #[test]
    fn detect_conflicts_is_empty_when_identical() {
        assert!(detect_conflicts(Path::new("/x.json"), Some(b"{}"), b"{}").is_empty());
    }

    #[test]
    fn detect_conflicts_flags_version_mismatch() {
        let existing = br#"{"version":1,"a":1}"#;
        let new_content = br#"{"version":2,"a":1}"#;
        let conflicts = detect_conflicts(Path::new("/x.json"), Some(existing), new_content);
        assert!(conflicts.iter().any(|c| c.kind == ConflictDetailKind::VersionConflict));
    }

    #[test]
    fn detect_conflicts_flags_structure_mismatch() {
        let existing = br#"{"a":1}"#;
        let new_content = br#"{"a":1,"b":2}"#;
        let conflicts = detect_conflicts(Path::new("/x.json"), Some(existing), new_content);
        assert!(conflicts.iter().any(|c| c.kind == ConflictDetailKind::StructureMismatch));
    }

    #[test]
    fn parse_sections_captures_preamble_and_headings() {
        let text = "intro text\n# Title\nbody one\n## Sub\nbody two\n";
        let sections = parse_sections(text);
        assert_eq!(sections[0].heading, "");
        assert_eq!(sections[0].body, "intro text\n");
        assert_eq!(sections[1].heading, "Title");
        assert_eq!(sections[1].body, "body one\n");
        assert_eq!(sections[2].heading, "Sub");
        assert_eq!(sections[2].body, "body two\n");
    }

    #[test]
    fn scenario_s4_task_status_preservation() {
        let existing = "- [x] 1.1 Foo\n- [ ] 1.2 Bar";
        let new_content = "- [ ] 1.1 Foo updated\n- [ ] 1.2 Bar\n- [ ] 1.3 Baz";
        let merged = preserve_task_status(existing, new_content);
        assert!(merged.contains("- [x] 1.1 Foo updated"));
        assert!(merged.contains("- [ ] 1.2 Bar"));
        assert!(merged.contains("- [ ] 1.3 Baz"));
    }

    #[test]
    fn task_identifier_falls_back_to_first_three_words() {
        assert_eq!(task_identifier("Review the changelog entries"), "review the changelog");
        assert_eq!(task_identifier("1.2 Fix bug"), "1.2");
    }

    #[test]
    fn scenario_s3_deep_merge_via_resolve() {
        let existing = br#"{"user":{"name":"A","age":30},"settings":{"theme":"dark"}}"#;
        let new_content = br#"{"user":{"name":"A","email":"x"},"settings":{"lang":"en"}}"#;
        let outcome = resolve(
            Path::new("/x.json"),
            Some(existing),
            new_content,
            ConflictStrategy::MergeIntelligent,
            Some(MergeStrategy::DeepMerge),
        )
        .unwrap();
        let merged: serde_json::Value = serde_json::from_slice(&outcome.content.unwrap()).unwrap();
        assert_eq!(
            merged,
            serde_json::json!({
                "user": {"name": "A", "age": 30, "email": "x"},
                "settings": {"theme": "dark", "lang": "en"},
            })
        );
        assert_eq!(outcome.resolution, Resolution::Merged);
    }

    #[test]
    fn resolve_backup_computes_sibling_path() {
        let outcome = resolve(Path::new("/x.json"), Some(b"{}"), b"{}", ConflictStrategy::Backup, None).unwrap();
        assert_eq!(outcome.backup_path, Some(PathBuf::from("/x.json.backup")));
    }

    #[test]
    fn resolve_merge_without_strategy_is_incompatible() {
        let err = resolve(Path::new("/x.json"), Some(b"{}"), b"{}", ConflictStrategy::Merge, None).unwrap_err();
        assert!(matches!(err, DeploymentError::MergeIncompatible { .. }));
    }

    #[test]
    fn resolve_deep_merge_on_markdown_is_incompatible() {
        let err = resolve(Path::new("/x.md"), Some(b"a"), b"b", ConflictStrategy::Merge, Some(MergeStrategy::DeepMerge)).unwrap_err();
        assert!(matches!(err, DeploymentError::MergeIncompatible { .. }));
    }

    #[test]
    fn suggest_strategy_matches_component_policy() {
        let suggestion = suggest_strategy(&[], &ComponentName::from("specs"));
        assert_eq!(suggestion.strategy, ConflictStrategy::PreserveTasks);
        let suggestion = suggest_strategy(&[], &ComponentName::from("hooks"));
        assert_eq!(suggestion.strategy, ConflictStrategy::Prompt);
    }

    #[test]
    fn validate_merge_compatibility_rejects_mismatched_type() {
        let result = validate_merge_compatibility(Path::new("/x.md"), MergeStrategy::DeepMerge);
        assert!(!result.compatible);
    }

    #[test]
    fn generate_report_groups_by_kind() {
        let conflicts = vec![
            (PathBuf::from("/a.json"), ConflictDetail { kind: ConflictDetailKind::ContentDiffers, detail: "x".to_owned() }),
            (PathBuf::from("/b.json"), ConflictDetail { kind: ConflictDetailKind::VersionConflict, detail: "y".to_owned() }),
        ];
        let report = generate_report(&conflicts);
        assert!(report.contains("Content differs"));
        assert!(report.contains("Version conflicts"));
    }

    #[test]
    fn merge_markdown_sections_preserves_tasks_within_matching_headings() {
        let existing = "# Tasks\n- [x] 1.1 Foo\n";
        let new_content = "# Tasks\n- [ ] 1.1 Foo updated\n- [ ] 1.2 Bar\n";
        let merged = merge_markdown_sections(existing, new_content);
        assert!(merged.contains("- [x] 1.1 Foo updated"));
        assert!(merged.contains("- [ ] 1.2 Bar"));
    }
}
