//! Remote document store seam and payload sanitization.
//!
//! # Responsibility
//! - Define the minimal upsert-with-merge / delete-by-id contract the drain
//!   loop needs from a remote document store.
//! - Map entity kinds to remote collection names.
//! - Turn unset optional fields into explicit nulls before upload.
//!
//! # Invariants
//! - Documents are addressed by `{collection, entity_id}`.
//! - Merge overwrites the fields present in the document and leaves every
//!   other remote field untouched.

use crate::model::goal::Goal;
use crate::model::note::Note;
use crate::model::record::SyncEntity;
use crate::model::sync_op::EntityKind;
use crate::model::task::Task;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Remote collections written by the sync processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RemoteCollection {
    Tasks,
    Goals,
    Notes,
}

impl RemoteCollection {
    /// Collection for an entity kind; `None` for kinds this build does not know.
    pub fn for_entity(kind: EntityKind) -> Option<Self> {
        match kind {
            EntityKind::Task => Some(Self::Tasks),
            EntityKind::Goal => Some(Self::Goals),
            EntityKind::Note => Some(Self::Notes),
            EntityKind::Unknown => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Goals => "goals",
            Self::Notes => "notes",
        }
    }
}

/// Error envelope returned by remote store adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// Stable machine-readable code, e.g. `unavailable`, `permission_denied`.
    pub code: String,
    pub message: String,
    /// Whether retrying the same request later can succeed.
    pub retryable: bool,
}

impl RemoteError {
    pub fn new(code: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }

    /// Transport-level failure (timeout, connection reset, DNS).
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new("unavailable", message, true)
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for RemoteError {}

/// Remote document store contract.
///
/// Implementations run on the scheduler thread, hence `Send + Sync`. Timeouts
/// are the adapter's transport defaults; the processor adds none.
pub trait RemoteStore: Send + Sync {
    /// Upserts `document` into `{collection, id}` with merge semantics.
    fn upsert_merge(
        &self,
        collection: RemoteCollection,
        id: &str,
        document: &Map<String, Value>,
    ) -> RemoteResult<()>;

    /// Deletes `{collection, id}`. Deleting a missing document succeeds.
    fn delete(&self, collection: RemoteCollection, id: &str) -> RemoteResult<()>;
}

/// Optional wire fields for an entity kind.
pub fn optional_fields(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Task => Task::OPTIONAL_FIELDS,
        EntityKind::Goal => Goal::OPTIONAL_FIELDS,
        EntityKind::Note => Note::OPTIONAL_FIELDS,
        EntityKind::Unknown => &[],
    }
}

/// Prepares a create/update payload for upload.
///
/// Optional fields that are absent from the snapshot are written as explicit
/// `null`, so a merge clears a value that was unset locally (for example
/// `completedAt` after un-completing a task).
pub fn sanitize_payload(kind: EntityKind, payload: &Map<String, Value>) -> Map<String, Value> {
    let mut document = payload.clone();
    for field in optional_fields(kind) {
        document.entry(*field).or_insert(Value::Null);
    }
    document
}

/// In-process remote store with merge semantics.
///
/// Used for local-only mode and dry runs; `set_reachable(false)` makes every
/// call fail with a retryable `unavailable` error.
#[derive(Default)]
pub struct MemoryRemoteStore {
    documents: Mutex<BTreeMap<(RemoteCollection, String), Map<String, Value>>>,
    unreachable: AtomicBool,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::SeqCst);
    }

    pub fn document(&self, collection: RemoteCollection, id: &str) -> Option<Map<String, Value>> {
        self.documents()
            .get(&(collection, id.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.documents().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents().is_empty()
    }

    fn check_reachable(&self) -> RemoteResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RemoteError::unavailable("memory remote marked unreachable"));
        }
        Ok(())
    }

    fn documents(
        &self,
    ) -> std::sync::MutexGuard<'_, BTreeMap<(RemoteCollection, String), Map<String, Value>>> {
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn upsert_merge(
        &self,
        collection: RemoteCollection,
        id: &str,
        document: &Map<String, Value>,
    ) -> RemoteResult<()> {
        self.check_reachable()?;
        let mut documents = self.documents();
        let existing = documents.entry((collection, id.to_string())).or_default();
        for (key, value) in document {
            existing.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn delete(&self, collection: RemoteCollection, id: &str) -> RemoteResult<()> {
        self.check_reachable()?;
        self.documents().remove(&(collection, id.to_string()));
        Ok(())
    }
}
