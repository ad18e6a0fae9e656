//! SQLite storage bootstrap, schema migrations and the local durable store.
//!
//! # Responsibility
//! - Open and configure SQLite connections for Tasky core.
//! - Apply schema migrations in deterministic order.
//! - Expose the table/index abstraction used by the action layer and sync.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod local_store;
pub mod migrations;
mod open;

pub use local_store::LocalStore;
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// A stored record body could not be encoded or decoded.
    Json(serde_json::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Index does not belong to the table it was queried on.
    UnknownIndex {
        table: &'static str,
        index: &'static str,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "invalid stored record: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::UnknownIndex { table, index } => {
                write!(f, "index `{index}` is not defined on table `{table}`")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::UnknownIndex { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for DbError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
