//! Local durable store: typed tables and indexes over SQLite.
//!
//! # Responsibility
//! - Upsert/delete/list records by table, read them back through indexes.
//! - Hold untyped key-value settings.
//! - Degrade to no-ops when no storage is available in the current context.
//!
//! # Invariants
//! - Records are stored as JSON bodies keyed by `id`; index columns are
//!   projections refreshed on every upsert.
//! - Upsert keeps the original insertion sequence, so index reads with equal
//!   keys come back in first-insert order.
//! - A record with no value for an index is not part of that index.
//! - Deleting an absent key is not an error.
//! - A row whose body does not decode is skipped by list reads, never fatal
//!   to the whole read, and never deleted.

use crate::db::{open_db, open_db_in_memory, DbError, DbResult};
use crate::model::record::{Index, IndexValue, Record, Table};
use log::{debug, warn};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Statement};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Handle to the on-device database.
///
/// Cheap to share behind `Arc`; every call takes the connection lock for the
/// duration of one statement.
pub struct LocalStore {
    conn: Option<Mutex<Connection>>,
}

impl LocalStore {
    /// Opens (creating/migrating if needed) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Store for contexts without persistent storage. Every operation is a no-op.
    pub fn unavailable() -> Self {
        Self { conn: None }
    }

    /// Opens `path` when given; falls back to an unavailable store when no path
    /// is configured or the database cannot be opened.
    pub fn open_or_unavailable(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            warn!("event=store_open module=db status=skip reason=no_storage_path");
            return Self::unavailable();
        };
        match Self::open(path) {
            Ok(store) => store,
            Err(err) => {
                warn!(
                    "event=store_open module=db status=error error_code=store_unavailable error={}",
                    err
                );
                Self::unavailable()
            }
        }
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Some(Mutex::new(conn)),
        }
    }

    /// Whether a database is backing this store.
    pub fn is_available(&self) -> bool {
        self.conn.is_some()
    }

    /// Returns every decodable record in the record's table. Order is
    /// unspecified.
    pub fn get_all<R: Record>(&self) -> DbResult<Vec<R>> {
        let Some(conn) = self.lock() else {
            return Ok(Vec::new());
        };
        let mut stmt = conn.prepare(&format!("SELECT id, body FROM {};", R::TABLE.name()))?;
        decode_rows(&mut stmt)
    }

    /// Returns one record by key.
    pub fn get<R: Record>(&self, id: &str) -> DbResult<Option<R>> {
        let Some(conn) = self.lock() else {
            return Ok(None);
        };
        let body: Option<String> = conn
            .query_row(
                &format!("SELECT body FROM {} WHERE id = ?1;", R::TABLE.name()),
                [id],
                |row| row.get(0),
            )
            .optional()?;
        body.map(decode_body).transpose()
    }

    /// Upserts a record by primary key.
    pub fn put<R: Record>(&self, record: &R) -> DbResult<()> {
        let Some(conn) = self.lock() else {
            debug!(
                "event=store_put module=db status=skip reason=store_unavailable table={}",
                R::TABLE.name()
            );
            return Ok(());
        };

        let table = R::TABLE;
        let body = serde_json::to_string(record)?;
        let index_columns: Vec<&'static str> =
            table.indexes().iter().map(|index| index.column()).collect();

        let mut columns = vec!["id", "body"];
        columns.extend(index_columns.iter().copied());
        let placeholders = (1..=columns.len())
            .map(|n| format!("?{n}"))
            .collect::<Vec<_>>()
            .join(", ");
        let updates = columns[1..]
            .iter()
            .map(|column| format!("{column} = excluded.{column}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT(id) DO UPDATE SET {};",
            table.name(),
            columns.join(", "),
            placeholders,
            updates
        );

        let mut bind_values = vec![
            SqlValue::Text(record.id().to_string()),
            SqlValue::Text(body),
        ];
        for index in table.indexes() {
            bind_values.push(match record.index_value(*index) {
                Some(IndexValue::Text(text)) => SqlValue::Text(text),
                Some(IndexValue::Integer(value)) => SqlValue::Integer(value),
                None => SqlValue::Null,
            });
        }

        conn.execute(&sql, params_from_iter(bind_values))?;
        Ok(())
    }

    /// Removes a record. Absent keys are ignored.
    pub fn delete(&self, table: Table, id: &str) -> DbResult<()> {
        let Some(conn) = self.lock() else {
            debug!(
                "event=store_delete module=db status=skip reason=store_unavailable table={}",
                table.name()
            );
            return Ok(());
        };
        conn.execute(&format!("DELETE FROM {} WHERE id = ?1;", table.name()), [id])?;
        Ok(())
    }

    /// Returns records of `R::TABLE` ordered by the indexed field ascending.
    pub fn get_all_from_index<R: Record>(&self, index: Index) -> DbResult<Vec<R>> {
        if index.table() != R::TABLE {
            return Err(DbError::UnknownIndex {
                table: R::TABLE.name(),
                index: index.name(),
            });
        }
        let Some(conn) = self.lock() else {
            return Ok(Vec::new());
        };

        let column = index.column();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, body FROM {}
             WHERE {column} IS NOT NULL
             ORDER BY {column} ASC, seq ASC;",
            R::TABLE.name()
        ))?;
        decode_rows(&mut stmt)
    }

    /// Number of records in a table.
    pub fn count(&self, table: Table) -> DbResult<usize> {
        let Some(conn) = self.lock() else {
            return Ok(0);
        };
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {};", table.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Reads one settings value.
    pub fn get_setting(&self, key: &str) -> DbResult<Option<Value>> {
        let Some(conn) = self.lock() else {
            return Ok(None);
        };
        let raw: Option<String> = conn
            .query_row("SELECT value FROM settings WHERE key = ?1;", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(raw.map(|text| serde_json::from_str(&text)).transpose()?)
    }

    /// Writes one settings value, replacing any previous one.
    pub fn put_setting(&self, key: &str, value: &Value) -> DbResult<()> {
        let Some(conn) = self.lock() else {
            return Ok(());
        };
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
            params![key, serde_json::to_string(value)?],
        )?;
        Ok(())
    }

    fn lock(&self) -> Option<MutexGuard<'_, Connection>> {
        let conn = self.conn.as_ref()?;
        // A panic mid-statement leaves SQLite itself consistent; keep serving.
        Some(conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }
}

fn decode_body<R: Record>(body: String) -> DbResult<R> {
    Ok(serde_json::from_str(&body)?)
}

/// Decodes `(id, body)` rows one by one. Rows that do not decode (written by
/// a newer build, or corrupt) are logged and left out; they stay on disk.
fn decode_rows<R: Record>(stmt: &mut Statement<'_>) -> DbResult<Vec<R>> {
    let mut rows = stmt.query([])?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        match decode_body(row.get::<_, String>(1)?) {
            Ok(record) => records.push(record),
            Err(err) => warn!(
                "event=store_decode module=db status=skip table={} id={} error={}",
                R::TABLE.name(),
                id,
                err
            ),
        }
    }
    Ok(records)
}
