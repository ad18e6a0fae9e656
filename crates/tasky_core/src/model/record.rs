//! Table/index metadata shared by the local store and the sync layer.

use crate::model::sync_op::EntityKind;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Guest identity used when no user is signed in.
pub const GUEST_USER_ID: &str = "guest";

/// Record tables in the local durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Tasks,
    Goals,
    Notes,
    SyncQueue,
}

impl Table {
    /// SQL table name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Goals => "goals",
            Self::Notes => "notes",
            Self::SyncQueue => "sync_queue",
        }
    }

    /// Indexes maintained for this table.
    pub fn indexes(self) -> &'static [Index] {
        match self {
            Self::Tasks => &[Index::ByList, Index::ByDate],
            Self::SyncQueue => &[Index::ByTimestamp],
            Self::Goals | Self::Notes => &[],
        }
    }
}

/// Secondary indexes. Reads through an index return records ordered by the
/// indexed field ascending, ties broken by insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    /// `tasks.listId`
    ByList,
    /// `tasks.dueDate`
    ByDate,
    /// `syncQueue.timestamp`
    ByTimestamp,
}

impl Index {
    pub fn name(self) -> &'static str {
        match self {
            Self::ByList => "by-list",
            Self::ByDate => "by-date",
            Self::ByTimestamp => "by-timestamp",
        }
    }

    pub fn table(self) -> Table {
        match self {
            Self::ByList | Self::ByDate => Table::Tasks,
            Self::ByTimestamp => Table::SyncQueue,
        }
    }

    /// Projection column holding the indexed value.
    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::ByList => "list_id",
            Self::ByDate => "due_date",
            Self::ByTimestamp => "timestamp",
        }
    }
}

/// Scalar value projected into an index column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexValue {
    Text(String),
    Integer(i64),
}

/// A record stored in one table of the local durable store.
pub trait Record: Serialize + DeserializeOwned {
    const TABLE: Table;

    /// Primary key.
    fn id(&self) -> &str;

    /// Value for `index`; `None` keeps the record out of that index.
    fn index_value(&self, _index: Index) -> Option<IndexValue> {
        None
    }
}

/// A user-owned record that is mirrored to the remote document store.
pub trait SyncEntity: Record + Clone {
    const KIND: EntityKind;

    /// Wire names of fields that may be unset. The remote store cannot hold
    /// an unset value, so these are sent as explicit `null` when absent.
    const OPTIONAL_FIELDS: &'static [&'static str];
}
