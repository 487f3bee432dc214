//! The Diff Engine (§4.1): recursive tree diff, deep-merge, and patch
//! application over `serde_json::Value`.
//!
//! Every function here is pure — no filesystem access, no clock, no
//! fallible I/O. Roots are compared under the synthetic path `"content"`
//! (§4.1), so a top-level key `user` shows up as `content.user`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

const ROOT: &str = "content";

// ---------------------------------------------------------------------------
// DiffResult
// ---------------------------------------------------------------------------

/// The kind of change a [`DiffEntry`] represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffKind {
    /// Present in `source`, absent in `target`.
    Addition,
    /// Present (with different value) in both.
    Modification,
    /// Present in `target`, absent in `source`.
    Deletion,
}

/// One addition, modification, or deletion found by [`diff`].
#[derive(Clone, Debug, PartialEq)]
pub struct DiffEntry {
    /// Dotted path, rooted at `"content"`.
    pub path: String,
    /// What kind of change this is.
    pub kind: DiffKind,
    /// The value on the `target` side, if any.
    pub old_value: Option<Value>,
    /// The value on the `source` side, if any.
    pub new_value: Option<Value>,
}

/// The result of comparing `source` against `target`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiffResult {
    /// Whether any entry was produced.
    pub has_changes: bool,
    /// Keys/subtrees present in `source` but not `target`.
    pub additions: Vec<DiffEntry>,
    /// Keys present in both with different values.
    pub modifications: Vec<DiffEntry>,
    /// Keys present in `target` but not `source`.
    pub deletions: Vec<DiffEntry>,
}

impl DiffResult {
    /// All entries, in additions-then-modifications-then-deletions order.
    ///
    /// `apply_patch(target, diff(source, target).all())` reconstructs
    /// `source` exactly (§8 Invariant 4).
    #[must_use]
    pub fn all(&self) -> Vec<DiffEntry> {
        self.additions
            .iter()
            .chain(self.modifications.iter())
            .chain(self.deletions.iter())
            .cloned()
            .collect()
    }
}

fn join(path: &str, key: &str) -> String {
    format!("{path}.{key}")
}

/// Recursively compare `source` against `target`, accumulating entries.
///
/// # Overview
///
/// - Both sides objects: per-key set-difference yields additions/deletions;
///   common keys recurse.
/// - Both sides arrays: compared by value equality; a difference yields a
///   single modification entry for the whole array.
/// - Anything else (primitives, or mismatched types): inequality yields a
///   single modification entry.
pub fn diff(source: &Value, target: &Value) -> DiffResult {
    let mut out = DiffResult::default();
    diff_into(ROOT, source, target, &mut out);
    out.has_changes =
        !out.additions.is_empty() || !out.modifications.is_empty() || !out.deletions.is_empty();
    out
}

fn diff_into(path: &str, source: &Value, target: &Value, out: &mut DiffResult) {
    match (source, target) {
        (Value::Object(s), Value::Object(t)) => {
            for (key, value) in s {
                if !t.contains_key(key) {
                    out.additions.push(DiffEntry {
                        path: join(path, key),
                        kind: DiffKind::Addition,
                        old_value: None,
                        new_value: Some(value.clone()),
                    });
                }
            }
            for (key, value) in t {
                if !s.contains_key(key) {
                    out.deletions.push(DiffEntry {
                        path: join(path, key),
                        kind: DiffKind::Deletion,
                        old_value: Some(value.clone()),
                        new_value: None,
                    });
                }
            }
            for (key, source_value) in s {
                if let Some(target_value) = t.get(key) {
                    diff_into(&join(path, key), source_value, target_value, out);
                }
            }
        }
        _ => {
            if source != target {
                out.modifications.push(DiffEntry {
                    path: path.to_owned(),
                    kind: DiffKind::Modification,
                    old_value: Some(target.clone()),
                    new_value: Some(source.clone()),
                });
            }
        }
    }
}

/// Format a [`DiffResult`] as a deterministic, grouped text listing.
///
/// Entries within a group are sorted by path so the output is stable across
/// runs regardless of `serde_json`'s (map-dependent) iteration order.
#[must_use]
pub fn format_diff(diff: &DiffResult, color: bool) -> String {
    let mut out = String::new();
    write_group(&mut out, "Additions", &diff.additions, '+', color, "32");
    write_group(&mut out, "Modifications", &diff.modifications, '~', color, "33");
    write_group(&mut out, "Deletions", &diff.deletions, '-', color, "31");
    out
}

fn write_group(out: &mut String, title: &str, entries: &[DiffEntry], marker: char, color: bool, ansi: &str) {
    if entries.is_empty() {
        return;
    }
    let mut sorted: Vec<&DiffEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));
    out.push_str(title);
    out.push_str(":\n");
    for entry in sorted {
        let line = match entry.kind {
            DiffKind::Addition => format!("  {marker} {} = {}\n", entry.path, render(&entry.new_value)),
            DiffKind::Deletion => format!("  {marker} {}\n", entry.path),
            DiffKind::Modification => {
                format!("  {marker} {}: {} -> {}\n", entry.path, render(&entry.old_value), render(&entry.new_value))
            }
        };
        if color {
            out.push_str(&format!("\x1b[{ansi}m{line}\x1b[0m"));
        } else {
            out.push_str(&line);
        }
    }
}

fn render(value: &Option<Value>) -> String {
    value.as_ref().map_or_else(|| "null".to_owned(), |v| v.to_string())
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

/// A merge strategy for [`merge`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeMode {
    /// Identity on `target`.
    Skip,
    /// `source` replaces `target` wholesale.
    Overwrite,
    /// Semantically `source`, with a marker recording that a backup was taken.
    Backup,
    /// Recursive deep-merge (see [`deep_merge`]).
    Merge,
}

/// Apply a merge strategy, producing the resulting tree.
#[must_use]
pub fn merge(target: &Value, source: &Value, mode: MergeMode) -> Value {
    match mode {
        MergeMode::Skip => target.clone(),
        MergeMode::Overwrite => source.clone(),
        MergeMode::Backup => mark_backed_up(source.clone()),
        MergeMode::Merge => deep_merge(target, source),
    }
}

fn mark_backed_up(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        map.insert("__deployBackedUp".to_owned(), Value::Bool(true));
    }
    value
}

/// Recursive deep-merge: both sides objects merge key-wise; both sides
/// arrays merge via [`array_merge`]; otherwise `source` replaces `target`.
#[must_use]
pub fn deep_merge(target: &Value, source: &Value) -> Value {
    match (target, source) {
        (Value::Object(t), Value::Object(s)) => {
            let mut result = t.clone();
            for (key, source_value) in s {
                let merged = match result.get(key) {
                    Some(target_value) => deep_merge(target_value, source_value),
                    None => source_value.clone(),
                };
                result.insert(key.clone(), merged);
            }
            Value::Object(result)
        }
        (Value::Array(t), Value::Array(s)) => array_merge(t, s),
        _ => source.clone(),
    }
}

/// Array-merge semantics (§4.1): if either side has an object element
/// carrying an `id` key, merge by id (source overrides matching ids,
/// non-matching source elements append); otherwise deduplicate by value,
/// preserving `target`'s order then `source`'s.
#[must_use]
pub fn array_merge(target: &[Value], source: &[Value]) -> Value {
    if has_id_object(target) || has_id_object(source) {
        Value::Array(array_merge_by_id(target, source))
    } else {
        Value::Array(array_union_dedup(target, source))
    }
}

fn has_id_object(values: &[Value]) -> bool {
    values.iter().any(|v| v.as_object().is_some_and(|o| o.contains_key("id")))
}

fn array_merge_by_id(target: &[Value], source: &[Value]) -> Vec<Value> {
    let mut result: Vec<Value> = target.to_vec();
    let mut id_positions: BTreeMap<String, usize> = BTreeMap::new();
    for (idx, value) in result.iter().enumerate() {
        if let Some(id) = element_id(value) {
            id_positions.insert(id, idx);
        }
    }
    for value in source {
        match element_id(value) {
            Some(id) => {
                if let Some(&idx) = id_positions.get(&id) {
                    result[idx] = deep_merge(&result[idx], value);
                } else {
                    id_positions.insert(id, result.len());
                    result.push(value.clone());
                }
            }
            None => result.push(value.clone()),
        }
    }
    result
}

/// Render an element's `id` field as a string key, if present.
///
/// Non-string ids (numbers, booleans) are rendered via their canonical JSON
/// form so they can share the same lookup map as string ids.
fn element_id(value: &Value) -> Option<String> {
    value.as_object()?.get("id").map(std::string::ToString::to_string)
}

fn array_union_dedup(target: &[Value], source: &[Value]) -> Vec<Value> {
    let mut result: Vec<Value> = Vec::with_capacity(target.len() + source.len());
    for value in target.iter().chain(source.iter()) {
        if !result.contains(value) {
            result.push(value.clone());
        }
    }
    result
}

// ---------------------------------------------------------------------------
// getConflicts
// ---------------------------------------------------------------------------

/// The kind of disagreement found by [`get_conflicts`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictKind {
    /// Same JSON type, different value.
    ValueConflict,
    /// Different JSON types.
    TypeConflict,
}

/// A single disagreement between `source` and `target` at a shared path.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueConflict {
    /// Dotted path, rooted at `"content"`.
    pub path: String,
    /// The value on the `source` side.
    pub source_value: Value,
    /// The value on the `target` side.
    pub target_value: Value,
    /// Whether the disagreement is a value or a type mismatch.
    pub kind: ConflictKind,
}

/// Find every path present on *both* sides whose values disagree.
///
/// Unlike [`diff`], this does not report additions or deletions — only
/// genuine conflicts on keys both sides define.
#[must_use]
pub fn get_conflicts(source: &Value, target: &Value) -> Vec<ValueConflict> {
    let mut out = Vec::new();
    collect_conflicts(ROOT, source, target, &mut out);
    out
}

fn collect_conflicts(path: &str, source: &Value, target: &Value, out: &mut Vec<ValueConflict>) {
    match (source, target) {
        (Value::Object(s), Value::Object(t)) => {
            for (key, source_value) in s {
                if let Some(target_value) = t.get(key) {
                    collect_conflicts(&join(path, key), source_value, target_value, out);
                }
            }
        }
        _ => {
            if source != target {
                let kind = if discriminant_name(source) == discriminant_name(target) {
                    ConflictKind::ValueConflict
                } else {
                    ConflictKind::TypeConflict
                };
                out.push(ValueConflict {
                    path: path.to_owned(),
                    source_value: source.clone(),
                    target_value: target.clone(),
                    kind,
                });
            }
        }
    }
}

const fn discriminant_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// applyPatch
// ---------------------------------------------------------------------------

/// Apply a set of [`DiffEntry`] values to `target`, producing a new tree.
///
/// Additions and modifications set the path to `new_value`; deletions
/// remove the path. `target` is not mutated in place.
#[must_use]
pub fn apply_patch(target: &Value, entries: &[DiffEntry]) -> Value {
    let mut result = target.clone();
    for entry in entries {
        match &entry.new_value {
            Some(value) => set_path(&mut result, &entry.path, value.clone()),
            None => remove_path(&mut result, &entry.path),
        }
    }
    result
}

fn path_segments(path: &str) -> Vec<&str> {
    path.split('.').skip(1).collect()
}

fn set_path(root: &mut Value, path: &str, value: Value) {
    let segments = path_segments(path);
    let Some((last, init)) = segments.split_last() else {
        *root = value;
        return;
    };
    let mut current = root;
    for segment in init {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else { unreachable!() };
        current = map.entry((*segment).to_owned()).or_insert_with(|| Value::Object(Map::new()));
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        map.insert((*last).to_owned(), value);
    }
}

fn remove_path(root: &mut Value, path: &str) {
    let segments = path_segments(path);
    let Some((last, init)) = segments.split_last() else {
        return;
    };
    let mut current = root;
    for segment in init {
        match current.get_mut(*segment) {
            Some(next) => current = next,
            None => return,
        }
    }
    if let Value::Object(map) = current {
        map.remove(*last);
    }
}
