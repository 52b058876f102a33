//! SQLite-backed [`RelationalStore`].

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, ToSql};
use serde_json::Value;

use super::schema::{SAMPLE_DATA, SCHEMA};
use super::{QueryRows, RelationalStore, SqlValue};
use crate::error::StorageError;

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Self::Bool(b) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(i64::from(*b))),
            Self::Integer(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Self::Real(f) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*f)),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// SQLite store behind a mutex.
///
/// `rusqlite::Connection` is `!Sync`; the mutex serializes access so the
/// store can be shared by concurrent requests.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) a database file.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates the registry tables and view if they do not exist.
    pub fn init(&self) -> Result<(), StorageError> {
        self.execute_batch(SCHEMA)
    }

    /// Loads the synthetic sample cohort.
    pub fn seed_sample(&self) -> Result<(), StorageError> {
        self.execute_batch(SAMPLE_DATA)
    }

    /// Whether the registry schema exists.
    pub fn is_initialized(&self) -> Result<bool, StorageError> {
        Ok(!self.table_columns("patients")?.is_empty())
    }

    /// Runs a batch of statements. Not reachable from any tool.
    pub fn execute_batch(&self, sql: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        conn.execute_batch(sql)?;
        Ok(())
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl RelationalStore for SqliteStore {
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryRows, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let width = columns.len();

        let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                values.push(json_value(row.get_ref(idx)?));
            }
            out.push(values);
        }

        Ok(QueryRows { columns, rows: out })
    }

    fn table_columns(&self, table: &str) -> Result<HashSet<String>, StorageError> {
        let rows = self.query(
            "SELECT name FROM pragma_table_info(?1)",
            &[SqlValue::from(table)],
        )?;
        Ok(rows
            .rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .filter_map(|v| v.as_str().map(str::to_lowercase))
            .collect())
    }
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<{} bytes>", bytes.len())),
    }
}
