//! Goal domain model.

use crate::model::record::{Record, SyncEntity, Table};
use crate::model::sync_op::EntityKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_GOAL_COLOR: &str = "blue";

/// Horizon a goal is planned over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: GoalType,
    pub start_date: i64,
    pub end_date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub is_deleted: bool,
}

impl Goal {
    /// Builds a new goal with a fresh id and the default color.
    pub fn create(
        user_id: impl Into<String>,
        title: impl Into<String>,
        kind: GoalType,
        start_date: i64,
        end_date: i64,
        now_ms: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: title.into(),
            kind,
            start_date,
            end_date,
            completed_at: None,
            color: Some(DEFAULT_GOAL_COLOR.to_string()),
            created_at: now_ms,
            updated_at: now_ms,
            is_deleted: false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

impl Record for Goal {
    const TABLE: Table = Table::Goals;

    fn id(&self) -> &str {
        &self.id
    }
}

impl SyncEntity for Goal {
    const KIND: EntityKind = EntityKind::Goal;
    const OPTIONAL_FIELDS: &'static [&'static str] = &["completedAt", "color"];
}

/// Partial goal update. `Some(None)` clears a clearable field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalPatch {
    pub title: Option<String>,
    pub kind: Option<GoalType>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub completed_at: Option<Option<i64>>,
    pub color: Option<Option<String>>,
    pub is_deleted: Option<bool>,
}

impl GoalPatch {
    pub fn apply(self, goal: &mut Goal) {
        if let Some(title) = self.title {
            goal.title = title;
        }
        if let Some(kind) = self.kind {
            goal.kind = kind;
        }
        if let Some(start_date) = self.start_date {
            goal.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            goal.end_date = end_date;
        }
        if let Some(completed_at) = self.completed_at {
            goal.completed_at = completed_at;
        }
        if let Some(color) = self.color {
            goal.color = color;
        }
        if let Some(is_deleted) = self.is_deleted {
            goal.is_deleted = is_deleted;
        }
    }
}
