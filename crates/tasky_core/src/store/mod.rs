//! In-memory entity stores mirrored from the local durable store.
//!
//! # Responsibility
//! - Serve synchronous reads to UI callers.
//! - Apply mutations optimistically, then persist through the action layer.
//!
//! # Invariants
//! - Memory is a cache; the durable store is authoritative and `load()`
//!   replaces memory with it.
//! - Mutators never fail from the caller's view. Unknown ids are no-ops.

mod cache;
pub mod goal_store;
pub mod note_store;
pub mod task_store;

pub use goal_store::GoalStore;
pub use note_store::NoteStore;
pub use task_store::{GoalProgress, TaskStore, ToggleOutcome};

/// Resolution of a soft reference (`goalId`, `parentId`, `taskId`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackRef<'a, T> {
    /// The record carries no reference.
    Unset,
    /// The referenced record is not present (deleted or never synced here).
    Dangling(&'a str),
    Resolved(&'a T),
}

impl<'a, T> BackRef<'a, T> {
    pub(crate) fn lookup(
        reference: Option<&'a str>,
        find: impl FnOnce(&str) -> Option<&'a T>,
    ) -> Self {
        match reference {
            None => Self::Unset,
            Some(id) => find(id).map_or(Self::Dangling(id), Self::Resolved),
        }
    }

    pub fn resolved(self) -> Option<&'a T> {
        match self {
            Self::Resolved(target) => Some(target),
            Self::Unset | Self::Dangling(_) => None,
        }
    }
}
