//! Domain records for tasks, goals, notes and queued sync operations.
//!
//! # Responsibility
//! - Define the canonical records persisted locally and mirrored remotely.
//! - Describe which table and indexes each record lives in.
//!
//! # Invariants
//! - Every entity is identified by a stable string id and owned by one user.
//! - Storage/wire field names are camelCase so local bodies and remote
//!   documents share one shape.

pub mod goal;
pub mod note;
pub mod record;
pub mod sync_op;
pub mod task;
