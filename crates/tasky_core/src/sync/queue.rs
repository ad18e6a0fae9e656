//! Durable, time-ordered holding area for pending sync operations.

use crate::db::{DbResult, LocalStore};
use crate::model::record::{Index, Table};
use crate::model::sync_op::{NewSyncOperation, SyncOperation};
use crate::time::now_ms;
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

/// Queue view over the `sync_queue` table. No capacity bound.
#[derive(Clone)]
pub struct SyncQueue {
    store: Arc<LocalStore>,
}

impl SyncQueue {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    /// Persists one operation with a fresh id, `timestamp = now` and zero retries.
    ///
    /// Returns `None` when the store is unavailable and nothing was queued.
    pub fn enqueue(&self, op: NewSyncOperation) -> DbResult<Option<SyncOperation>> {
        if !self.store.is_available() {
            return Ok(None);
        }

        let stored = SyncOperation {
            id: Uuid::new_v4().to_string(),
            op_type: op.op_type,
            entity: op.entity,
            entity_id: op.entity_id,
            payload: op.payload,
            timestamp: now_ms(),
            retry_count: 0,
        };
        self.store.put(&stored)?;
        debug!(
            "event=queue_append module=sync status=ok op_id={} op_type={} entity={}",
            stored.id,
            stored.op_type.as_str(),
            stored.entity.as_str()
        );
        Ok(Some(stored))
    }

    /// Pending operations in enqueue order.
    ///
    /// Rows this build cannot decode are left in the table for a build that
    /// can, and are not returned.
    pub fn pending(&self) -> DbResult<Vec<SyncOperation>> {
        self.store.get_all_from_index(Index::ByTimestamp)
    }

    /// Drops one operation. Removing an already-removed id is a no-op.
    pub fn remove(&self, op_id: &str) -> DbResult<()> {
        self.store.delete(Table::SyncQueue, op_id)
    }

    pub fn len(&self) -> DbResult<usize> {
        self.store.count(Table::SyncQueue)
    }

    pub fn is_empty(&self) -> DbResult<bool> {
        Ok(self.len()? == 0)
    }
}
