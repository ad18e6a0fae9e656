//! Note domain model.
//!
//! # Responsibility
//! - Define the note record and its partial-update patch.
//! - Derive a plain-text preview from the editor document.
//!
//! # Invariants
//! - `content` is an opaque editor document; core never interprets its
//!   structure beyond collecting `text` leaves for the preview.

use crate::model::record::{Record, SyncEntity, Table};
use crate::model::sync_op::EntityKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const DEFAULT_NOTE_COLOR: &str = "yellow";
const PREVIEW_MAX_CHARS: usize = 100;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub title: String,
    #[serde(default = "empty_document")]
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_preview: Option<String>,
    pub color: String,
    #[serde(default)]
    pub is_checklist: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub is_deleted: bool,
}

/// Fields accepted when adding a note.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewNote {
    pub title: String,
    pub content: Option<Value>,
    pub color: Option<String>,
    /// Explicit preview; derived from `content` when `None`.
    pub text_preview: Option<String>,
    pub task_id: Option<String>,
}

impl NewNote {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

impl Note {
    /// Builds a new note with a fresh id, default color, unpinned and unarchived.
    pub fn create(user_id: impl Into<String>, new_note: NewNote, now_ms: i64) -> Self {
        let content = new_note.content.unwrap_or_else(empty_document);
        let text_preview = new_note
            .text_preview
            .or_else(|| Some(derive_text_preview(&content)));
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            task_id: new_note.task_id,
            title: new_note.title,
            content,
            text_preview,
            color: new_note
                .color
                .unwrap_or_else(|| DEFAULT_NOTE_COLOR.to_string()),
            is_checklist: false,
            pinned: false,
            archived: false,
            tags: Vec::new(),
            created_at: now_ms,
            updated_at: now_ms,
            is_deleted: false,
        }
    }
}

impl Record for Note {
    const TABLE: Table = Table::Notes;

    fn id(&self) -> &str {
        &self.id
    }
}

impl SyncEntity for Note {
    const KIND: EntityKind = EntityKind::Note;
    const OPTIONAL_FIELDS: &'static [&'static str] = &["taskId", "textPreview"];
}

/// Partial note update. `Some(None)` clears a clearable field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<Value>,
    pub text_preview: Option<Option<String>>,
    pub color: Option<String>,
    pub is_checklist: Option<bool>,
    pub pinned: Option<bool>,
    pub archived: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub task_id: Option<Option<String>>,
    pub is_deleted: Option<bool>,
}

impl NotePatch {
    pub fn apply(self, note: &mut Note) {
        if let Some(title) = self.title {
            note.title = title;
        }
        if let Some(content) = self.content {
            note.content = content;
        }
        if let Some(text_preview) = self.text_preview {
            note.text_preview = text_preview;
        }
        if let Some(color) = self.color {
            note.color = color;
        }
        if let Some(is_checklist) = self.is_checklist {
            note.is_checklist = is_checklist;
        }
        if let Some(pinned) = self.pinned {
            note.pinned = pinned;
        }
        if let Some(archived) = self.archived {
            note.archived = archived;
        }
        if let Some(tags) = self.tags {
            note.tags = tags;
        }
        if let Some(task_id) = self.task_id {
            note.task_id = task_id;
        }
        if let Some(is_deleted) = self.is_deleted {
            note.is_deleted = is_deleted;
        }
    }
}

/// Collects the `text` leaves of an editor document into a short preview.
///
/// Whitespace runs collapse to one space; the result keeps the first 100 chars.
pub fn derive_text_preview(content: &Value) -> String {
    let mut parts = Vec::new();
    collect_text(content, &mut parts);
    let joined = parts.join(" ");
    let normalized = WHITESPACE_RE.replace_all(&joined, " ");
    normalized.trim().chars().take(PREVIEW_MAX_CHARS).collect()
}

fn collect_text<'a>(value: &'a Value, parts: &mut Vec<&'a str>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(text)) = map.get("text") {
                parts.push(text.as_str());
            }
            for (key, child) in map {
                if key != "text" {
                    collect_text(child, parts);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_text(item, parts);
            }
        }
        _ => {}
    }
}

fn empty_document() -> Value {
    Value::Object(Map::new())
}
