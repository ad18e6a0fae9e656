//! Task domain model.
//!
//! # Responsibility
//! - Define the task record, its enums and partial-update patch.
//! - Apply creation defaults (priority, my-day flag, ordering key).
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `goal_id`/`parent_id` are soft references; the target may be gone.
//! - `completed_at` is set iff the task was completed through a toggle.

use crate::model::record::{Index, IndexValue, Record, SyncEntity, Table};
use crate::model::sync_op::EntityKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// List id of the built-in "My Day" list.
pub const MY_DAY_LIST_ID: &str = "my-day";
/// Default list for new tasks.
pub const INBOX_LIST_ID: &str = "inbox";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Repeat rule. `Custom` has no fixed calendar step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Synced,
    Pending,
    Error,
}

/// Checklist step inside a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,
    pub title: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub title: String,
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    /// Unix epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<Repeat>,
    pub list_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<String>,
    #[serde(default)]
    pub steps: Vec<SubTask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub is_my_day: bool,
    /// Display position; lower sorts first.
    pub order: i64,
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_status: Option<SyncStatus>,
}

/// Optional fields accepted when adding a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTaskOptions {
    pub due_date: Option<i64>,
    pub repeat: Option<Repeat>,
    pub priority: Option<Priority>,
    pub goal_id: Option<String>,
    pub parent_id: Option<String>,
}

impl Task {
    /// Builds a new task with a fresh id and creation defaults.
    ///
    /// # Invariants
    /// - `created_at == updated_at == order == now_ms`.
    /// - `is_my_day` is true iff `list_id` is the my-day list.
    /// - `sync_status` starts as `Pending`.
    pub fn create(
        user_id: impl Into<String>,
        title: impl Into<String>,
        list_id: impl Into<String>,
        options: NewTaskOptions,
        now_ms: i64,
    ) -> Self {
        let list_id = list_id.into();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            parent_id: options.parent_id,
            title: title.into(),
            completed: false,
            priority: options.priority.unwrap_or_default(),
            due_date: options.due_date,
            repeat: options.repeat,
            is_my_day: list_id == MY_DAY_LIST_ID,
            list_id,
            goal_id: options.goal_id,
            steps: Vec::new(),
            note: None,
            order: now_ms,
            is_deleted: false,
            created_at: now_ms,
            updated_at: now_ms,
            completed_at: None,
            sync_status: Some(SyncStatus::Pending),
        }
    }

    /// Repeat rule that spawns a follow-up task on completion.
    pub fn recurring_rule(&self) -> Option<Repeat> {
        match self.repeat {
            Some(Repeat::Custom) | None => None,
            Some(rule) => Some(rule),
        }
    }
}

impl Record for Task {
    const TABLE: Table = Table::Tasks;

    fn id(&self) -> &str {
        &self.id
    }

    fn index_value(&self, index: Index) -> Option<IndexValue> {
        match index {
            Index::ByList => Some(IndexValue::Text(self.list_id.clone())),
            Index::ByDate => self.due_date.map(IndexValue::Integer),
            Index::ByTimestamp => None,
        }
    }
}

impl SyncEntity for Task {
    const KIND: EntityKind = EntityKind::Task;
    const OPTIONAL_FIELDS: &'static [&'static str] = &[
        "parentId",
        "dueDate",
        "repeat",
        "goalId",
        "note",
        "completedAt",
        "syncStatus",
    ];
}

/// Partial task update. `Some(None)` clears a clearable field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<i64>>,
    pub repeat: Option<Option<Repeat>>,
    pub list_id: Option<String>,
    pub goal_id: Option<Option<String>>,
    pub parent_id: Option<Option<String>>,
    pub steps: Option<Vec<SubTask>>,
    pub note: Option<Option<String>>,
    pub is_my_day: Option<bool>,
    pub order: Option<i64>,
    pub completed_at: Option<Option<i64>>,
    pub is_deleted: Option<bool>,
}

impl TaskPatch {
    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(repeat) = self.repeat {
            task.repeat = repeat;
        }
        if let Some(list_id) = self.list_id {
            task.list_id = list_id;
        }
        if let Some(goal_id) = self.goal_id {
            task.goal_id = goal_id;
        }
        if let Some(parent_id) = self.parent_id {
            task.parent_id = parent_id;
        }
        if let Some(steps) = self.steps {
            task.steps = steps;
        }
        if let Some(note) = self.note {
            task.note = note;
        }
        if let Some(is_my_day) = self.is_my_day {
            task.is_my_day = is_my_day;
        }
        if let Some(order) = self.order {
            task.order = order;
        }
        if let Some(completed_at) = self.completed_at {
            task.completed_at = completed_at;
        }
        if let Some(is_deleted) = self.is_deleted {
            task.is_deleted = is_deleted;
        }
    }
}
