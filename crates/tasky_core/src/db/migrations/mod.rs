//! Schema migrations for the local database.
//!
//! # Invariants
//! - Versions are strictly increasing and never reused.
//! - The applied version is mirrored to `PRAGMA user_version`.
//! - All pending steps commit together or not at all.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "entities",
        sql: include_str!("0001_entities.sql"),
    },
    Migration {
        version: 2,
        name: "sync_queue",
        sql: include_str!("0002_sync_queue.sql"),
    },
];

/// Latest schema version this build understands.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings `conn` up to [`latest_version`].
///
/// # Errors
/// - [`DbError::UnsupportedSchemaVersion`] when the file was written by a
///   newer build.
/// - Any SQLite error raised by a migration step; nothing is committed then.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = schema_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > from).collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in &pending {
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
        debug!(
            "event=db_migrate module=db status=step version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} steps={}",
        from,
        latest,
        pending.len()
    );
    Ok(())
}

fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
