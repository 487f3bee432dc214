//! The portable configuration tree consumed by the deployment core.
//!
//! `Context` is produced by an external, out-of-scope artifact fetcher and
//! treated as read-only by everything downstream. Each section keeps an
//! `extra` catch-all map so fields the fetcher adds in the future round-trip
//! through the core untouched instead of being silently dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The full portable configuration tree for one project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    /// Project identity, source/target tags, timestamps.
    pub metadata: Metadata,
    /// User preferences, editor, and AI settings.
    #[serde(default)]
    pub personal_context: PersonalContext,
    /// Dependencies, scripts, and workspace layout.
    #[serde(default)]
    pub project_context: ProjectContext,
    /// Ordered rules, free-form text, examples, workflows.
    #[serde(default)]
    pub prompt_context: PromptContext,
    /// Optional security annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityContext>,
}

/// Project identity and provenance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Human-readable project name.
    pub project_name: String,
    /// Platform this context was authored on or fetched from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_platform: Option<String>,
    /// Platform this context is destined for, if already known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_platform: Option<String>,
    /// Free-form labels.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Unix-millisecond creation timestamp.
    pub created_at: u64,
    /// Unix-millisecond last-update timestamp.
    pub updated_at: u64,
    /// Fields the fetcher may add later; preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// User preferences, editor, and AI assistant settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalContext {
    /// Editor-specific preferences (font size, theme, keybindings, ...).
    #[serde(default)]
    pub editor: BTreeMap<String, Value>,
    /// AI assistant settings (model, temperature, custom instructions, ...).
    #[serde(default)]
    pub ai_settings: BTreeMap<String, Value>,
    /// Fields the fetcher may add later; preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Project-level dependencies, scripts, and workspace layout.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectContext {
    /// Declared dependencies, by ecosystem.
    #[serde(default)]
    pub dependencies: BTreeMap<String, Value>,
    /// Named scripts/tasks.
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
    /// Workspace layout description (directories, entry points).
    #[serde(default)]
    pub workspace_layout: BTreeMap<String, Value>,
    /// Fields the fetcher may add later; preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Ordered prompt/rule content.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptContext {
    /// Ordered AI rules, in the order they should be applied.
    #[serde(default)]
    pub rules: Vec<PromptRule>,
    /// Free-form prose not captured by a structured rule.
    #[serde(default)]
    pub free_form_text: Vec<String>,
    /// Worked examples.
    #[serde(default)]
    pub examples: Vec<Value>,
    /// Named multi-step workflows.
    #[serde(default)]
    pub workflows: Vec<Value>,
}

/// A single ordered AI rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromptRule {
    /// Rule title.
    pub title: String,
    /// Rule body.
    pub body: String,
    /// Position in the authored order (lower sorts first).
    pub order: u32,
}

/// Optional security posture annotations attached to a context.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityContext {
    /// Names of secrets the context references (not their values).
    #[serde(default)]
    pub referenced_secrets: Vec<String>,
    /// Whether the context was scanned for leaked credentials before fetch.
    #[serde(default)]
    pub scanned: bool,
    /// Free-form annotations from the scanner.
    #[serde(default)]
    pub notes: Vec<String>,
}
