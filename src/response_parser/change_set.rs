use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Status {
    Completed,
    NeedsContext,
    /// Missing or unrecognized status. Reported, never treated as an error.
    Unknown,
}

impl Status {
    fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "COMPLETED" => Status::Completed,
            "NEED_CONTEXT" => Status::NeedsContext,
            _ => Status::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum EditKind {
    FullRewrite,
    SearchReplaceDiff,
    UnifiedPatchEnvelope,
}

impl EditKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "FULL_REWRITE" => Some(EditKind::FullRewrite),
            "DIFF" => Some(EditKind::SearchReplaceDiff),
            "PATCH" => Some(EditKind::UnifiedPatchEnvelope),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Edit {
    pub file_path: PathBuf,
    pub kind: EditKind,
    pub content: String,
}

/// Canonical form of a model response.
///
/// `edits` is only ever populated for [`Status::Completed`] and
/// `requested_files` only for [`Status::NeedsContext`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ChangeSet {
    pub status: Status,
    pub reasoning: Option<String>,
    pub requested_files: Vec<PathBuf>,
    pub edits: Vec<Edit>,
    /// Entries of `code_changes` that were dropped (unknown `type`, no path, not an object).
    pub dropped_edits: usize,
}

// One entry of `code_changes` as the model wrote it.
#[derive(Debug, Deserialize)]
struct RawEdit {
    #[serde(alias = "path")]
    file_path: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    content: Option<String>,
}

pub(crate) fn parse_change_set(value: Value) -> ChangeSet {
    match value {
        Value::Array(items) => from_edit_array(&items),
        Value::Object(object) => from_object(&object),
        _ => ChangeSet::empty(Status::Unknown, None),
    }
}

fn from_edit_array(items: &[Value]) -> ChangeSet {
    let (edits, dropped_edits) = coerce_edits(items);
    ChangeSet {
        edits,
        dropped_edits,
        ..ChangeSet::empty(Status::Completed, None)
    }
}

fn from_object(object: &Map<String, Value>) -> ChangeSet {
    let code_changes = object.get("code_changes").and_then(Value::as_array);

    let status = match object.get("status") {
        Some(Value::String(tag)) => Status::from_tag(tag),
        Some(_) => Status::Unknown,
        None if code_changes.is_some() => Status::Completed,
        None => Status::Unknown,
    };

    let reasoning = object
        .get("reasoning")
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut change_set = ChangeSet::empty(status, reasoning);
    match status {
        Status::Completed => {
            let (edits, dropped) = coerce_edits(code_changes.map(Vec::as_slice).unwrap_or(&[]));
            change_set.edits = edits;
            change_set.dropped_edits = dropped;
        }
        Status::NeedsContext => {
            change_set.requested_files = object
                .get("request_files")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .map(coerce_paths)
                .unwrap_or_default();
        }
        Status::Unknown => {}
    }
    change_set
}

fn coerce_edits(items: &[Value]) -> (Vec<Edit>, usize) {
    let mut edits = Vec::with_capacity(items.len());
    let mut dropped = 0;

    for item in items {
        match coerce_edit(item) {
            Some(edit) => edits.push(edit),
            None => dropped += 1,
        }
    }
    (edits, dropped)
}

fn coerce_edit(item: &Value) -> Option<Edit> {
    let raw: RawEdit = serde_json::from_value(item.clone()).ok()?;
    let kind = EditKind::from_tag(raw.kind.as_deref()?)?;
    let file_path = raw.file_path.map(|p| p.trim().to_string())?;
    if file_path.is_empty() {
        return None;
    }
    Some(Edit {
        file_path: PathBuf::from(file_path),
        kind,
        content: raw.content.unwrap_or_default(),
    })
}

fn coerce_paths(paths: &[Value]) -> Vec<PathBuf> {
    paths
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

impl ChangeSet {
    fn empty(status: Status, reasoning: Option<String>) -> Self {
        Self {
            status,
            reasoning,
            requested_files: Vec::new(),
            edits: Vec::new(),
            dropped_edits: 0,
        }
    }
}
