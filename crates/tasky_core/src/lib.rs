//! Core of Tasky: offline-first tasks, goals and notes.
//!
//! Every mutation lands in local durable storage first and is mirrored to a
//! remote document store by a background sync queue.

pub mod app;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod session;
pub mod store;
pub mod sync;
pub mod time;

pub use app::TaskyCore;
pub use config::{ConfigError, CoreConfig};
pub use db::{DbError, DbResult, LocalStore};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::goal::{Goal, GoalPatch, GoalType};
pub use model::note::{NewNote, Note, NotePatch};
pub use model::sync_op::{EntityKind, SyncOperation, SyncOperationType};
pub use model::task::{NewTaskOptions, Priority, Repeat, Task, TaskPatch};
pub use service::local_actions::{ActionOutcome, ActionType, LocalActions};
pub use session::Session;
pub use store::{BackRef, GoalProgress, GoalStore, NoteStore, TaskStore, ToggleOutcome};
pub use sync::connectivity::{Connectivity, NetworkMonitor};
pub use sync::processor::{SyncPass, SyncProcessor, SyncReport};
pub use sync::queue::SyncQueue;
pub use sync::remote::{MemoryRemoteStore, RemoteCollection, RemoteError, RemoteStore};
pub use sync::scheduler::SyncScheduler;

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
