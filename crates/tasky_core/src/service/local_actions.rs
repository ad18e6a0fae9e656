//! Entity action layer: local write plus sync enqueue as one step.
//!
//! # Responsibility
//! - Write an entity into its table, then append the matching sync operation.
//! - Report each failure seam as its own outcome.
//!
//! # Invariants
//! - Exactly one queue entry per successful call; no coalescing of repeated
//!   updates to the same entity.
//! - The entity write happens before the enqueue. A failure in between leaves
//!   the write in place with no queue entry (the change is never uploaded).
//! - With no storage available nothing is written and nothing is queued.

use crate::db::{DbError, LocalStore};
use crate::model::record::SyncEntity;
use crate::model::sync_op::{NewSyncOperation, SyncOperationType};
use crate::sync::queue::SyncQueue;
use log::{debug, error};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Upsert flavor of a local action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    Create,
    Update,
}

impl From<ActionType> for SyncOperationType {
    fn from(value: ActionType) -> Self {
        match value {
            ActionType::Create => Self::Create,
            ActionType::Update => Self::Update,
        }
    }
}

/// What happened to one local action.
#[derive(Debug)]
pub enum ActionOutcome {
    /// Entity written and operation queued.
    Persisted { op_id: String },
    /// No storage in this context; nothing persisted, nothing queued.
    StoreUnavailable,
    /// Entity write failed; nothing queued.
    EntityWriteFailed(DbError),
    /// Entity written, but the change will not be uploaded.
    QueueAppendFailed(DbError),
}

impl ActionOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted { .. })
    }
}

/// Pairs local writes with sync-queue entries.
#[derive(Clone)]
pub struct LocalActions {
    store: Arc<LocalStore>,
    queue: SyncQueue,
}

impl LocalActions {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self {
            queue: SyncQueue::new(Arc::clone(&store)),
            store,
        }
    }

    /// Upserts `entity` and queues a create/update carrying its full snapshot.
    pub fn perform_local_action<E: SyncEntity>(
        &self,
        entity: &E,
        action: ActionType,
    ) -> ActionOutcome {
        let op_type = SyncOperationType::from(action);
        if !self.store.is_available() {
            debug!(
                "event=local_action module=service status=skip reason=store_unavailable op_type={} entity={}",
                op_type.as_str(),
                E::KIND.as_str()
            );
            return ActionOutcome::StoreUnavailable;
        }

        if let Err(err) = self.store.put(entity) {
            error!(
                "event=entity_write module=service status=error op_type={} entity={} entity_id={} error={}",
                op_type.as_str(),
                E::KIND.as_str(),
                entity.id(),
                err
            );
            return ActionOutcome::EntityWriteFailed(err);
        }

        let payload = match snapshot(entity) {
            Ok(payload) => payload,
            Err(err) => return self.queue_failed(op_type, E::KIND.as_str(), entity.id(), err),
        };
        self.enqueue(NewSyncOperation {
            op_type,
            entity: E::KIND,
            entity_id: entity.id().to_string(),
            payload,
        })
    }

    /// Removes the entity row and queues a delete with an empty payload.
    pub fn perform_local_delete<E: SyncEntity>(&self, id: &str) -> ActionOutcome {
        if !self.store.is_available() {
            debug!(
                "event=local_action module=service status=skip reason=store_unavailable op_type=DELETE entity={}",
                E::KIND.as_str()
            );
            return ActionOutcome::StoreUnavailable;
        }

        if let Err(err) = self.store.delete(E::TABLE, id) {
            error!(
                "event=entity_write module=service status=error op_type=DELETE entity={} entity_id={} error={}",
                E::KIND.as_str(),
                id,
                err
            );
            return ActionOutcome::EntityWriteFailed(err);
        }

        self.enqueue(NewSyncOperation {
            op_type: SyncOperationType::Delete,
            entity: E::KIND,
            entity_id: id.to_string(),
            payload: Map::new(),
        })
    }

    fn enqueue(&self, op: NewSyncOperation) -> ActionOutcome {
        let op_type = op.op_type;
        let entity = op.entity;
        let entity_id = op.entity_id.clone();
        match self.queue.enqueue(op) {
            Ok(Some(stored)) => ActionOutcome::Persisted { op_id: stored.id },
            Ok(None) => ActionOutcome::StoreUnavailable,
            Err(err) => self.queue_failed(op_type, entity.as_str(), &entity_id, err),
        }
    }

    fn queue_failed(
        &self,
        op_type: SyncOperationType,
        entity: &str,
        entity_id: &str,
        err: DbError,
    ) -> ActionOutcome {
        error!(
            "event=queue_append module=service status=error op_type={} entity={} entity_id={} error={}",
            op_type.as_str(),
            entity,
            entity_id,
            err
        );
        ActionOutcome::QueueAppendFailed(err)
    }
}

fn snapshot<E: SyncEntity>(entity: &E) -> Result<Map<String, Value>, DbError> {
    match serde_json::to_value(entity)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}
