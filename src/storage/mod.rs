//! Relational store boundary used by the tool registry.
//!
//! The registry only needs synchronous query execution returning column
//! names and rows, plus column introspection for the alias rewriter.
//! [`SqliteStore`] is the bundled implementation.

pub mod schema;
pub mod sqlite;

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::StorageError;

pub use sqlite::SqliteStore;

/// Default database location, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".biolink/registry.db";

/// A bound query parameter.
///
/// Filter values always travel as parameters, never spliced into SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL `NULL`.
    Null,
    /// Boolean, stored as 0/1.
    Bool(bool),
    /// 64-bit integer.
    Integer(i64),
    /// Floating point.
    Real(f64),
    /// Text.
    Text(String),
}

impl SqlValue {
    /// JSON rendering, for audit records of bound parameters.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Integer(i) => Value::from(*i),
            Self::Real(f) => Value::from(*f),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

/// Column names plus row values from one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRows {
    /// Column names in select order.
    pub columns: Vec<String>,
    /// Row values, each as wide as `columns`.
    pub rows: Vec<Vec<Value>>,
}

impl QueryRows {
    /// Zips each row with the column names.
    #[must_use]
    pub fn into_records(self) -> Vec<Map<String, Value>> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|row| columns.iter().cloned().zip(row).collect())
            .collect()
    }
}

/// Synchronous relational store.
///
/// Implementations must be shareable across request tasks; the registry runs
/// calls on a blocking worker so they never stall the async scheduler.
pub trait RelationalStore: Send + Sync {
    /// Runs a read query with positional parameters (`?1`, `?2`, ...).
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryRows, StorageError>;

    /// Returns the lowercase column names of `table` (empty if it does not
    /// exist).
    fn table_columns(&self, table: &str) -> Result<HashSet<String>, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_records_zips_columns() {
        let rows = QueryRows {
            columns: vec!["gender".to_string(), "count".to_string()],
            rows: vec![
                vec![Value::from("female"), Value::from(3)],
                vec![Value::from("male"), Value::from(2)],
            ],
        };
        let records = rows.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["gender"], "female");
        assert_eq!(records[1]["count"], 2);
    }

    #[test]
    fn test_sql_value_conversions() {
        assert_eq!(SqlValue::from("beirut"), SqlValue::Text("beirut".to_string()));
        assert_eq!(SqlValue::from(true), SqlValue::Bool(true));
        assert_eq!(SqlValue::from(42_i64), SqlValue::Integer(42));
    }
}
