//! Queued description of one pending remote change.
//!
//! # Invariants
//! - Created once per local action, removed once applied remotely, never
//!   updated in place.
//! - `timestamp` is the FIFO ordering key.
//! - `payload` is the full entity snapshot for create/update, empty for delete.

use crate::model::record::{Index, IndexValue, Record, Table};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of change carried by one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncOperationType {
    Create,
    Update,
    Delete,
}

impl SyncOperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// Entity type an operation refers to.
///
/// Values written by a newer build deserialize to `Unknown` and are skipped
/// by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Task,
    Goal,
    Note,
    #[serde(other)]
    Unknown,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "TASK",
            Self::Goal => "GOAL",
            Self::Note => "NOTE",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Local table holding records of this kind.
    pub fn table(self) -> Option<Table> {
        match self {
            Self::Task => Some(Table::Tasks),
            Self::Goal => Some(Table::Goals),
            Self::Note => Some(Table::Notes),
            Self::Unknown => None,
        }
    }
}

/// Operation as handed to the queue; id, timestamp and retry count are
/// assigned on enqueue.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSyncOperation {
    pub op_type: SyncOperationType,
    pub entity: EntityKind,
    pub entity_id: String,
    pub payload: Map<String, Value>,
}

/// Persisted queue entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOperation {
    pub id: String,
    #[serde(rename = "type")]
    pub op_type: SyncOperationType,
    pub entity: EntityKind,
    pub entity_id: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
    pub timestamp: i64,
    /// Kept for schema compatibility; not incremented (retries are unbounded).
    #[serde(default)]
    pub retry_count: u32,
}

impl Record for SyncOperation {
    const TABLE: Table = Table::SyncQueue;

    fn id(&self) -> &str {
        &self.id
    }

    fn index_value(&self, index: Index) -> Option<IndexValue> {
        match index {
            Index::ByTimestamp => Some(IndexValue::Integer(self.timestamp)),
            Index::ByList | Index::ByDate => None,
        }
    }
}
