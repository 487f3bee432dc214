//! The shape of a single file the deployment writes (§3).
//!
//! Produced by the (out-of-scope) per-platform transformer; owned by the
//! orchestrator for the duration of one deployment.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ids::ComponentName;

/// The serialization shape of an artifact's content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    /// JSON content, diffed/merged via `deploy_model::diff`.
    Json,
    /// Markdown content, resolved via section/task-list rules.
    Markdown,
    /// Opaque text content; only `skip`/`overwrite`/`backup` apply.
    Text,
}

/// A single file to be written by the deployment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetArtifact {
    /// Absolute path the file should be written to.
    pub path: PathBuf,
    /// The component this artifact belongs to.
    pub component: ComponentName,
    /// The content shape.
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    /// The content to write.
    pub content: ArtifactContent,
}

/// The artifact's content, tagged by [`ArtifactType`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtifactContent {
    /// Structured JSON content.
    Json(serde_json::Value),
    /// Raw text (markdown or otherwise).
    Text(String),
}

impl ArtifactContent {
    /// Borrow the content as bytes for writing/hashing.
    #[must_use]
    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            Self::Json(v) => serde_json::to_vec_pretty(v).unwrap_or_default(),
            Self::Text(s) => s.clone().into_bytes(),
        }
    }

    /// Borrow the content as text, for markdown-oriented operations.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Json(_) => None,
        }
    }

    /// Borrow the content as a JSON value, for diff/merge operations.
    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            Self::Text(_) => None,
        }
    }
}
