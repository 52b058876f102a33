//! Result records returned by registry tools.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::QueryRows;

/// Rows returned by a query-shaped tool.
///
/// Execution failures are reported here with `error` set and `count == 0`
/// instead of as an `Err`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    /// Result rows keyed by column name.
    pub rows: Vec<Map<String, Value>>,
    /// Number of rows.
    pub count: usize,
    /// Execution error, if the query failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The executed SQL, reported alongside failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    /// Vega-Lite spec for chart queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<Value>,
}

impl RowSet {
    /// Builds a row set from raw query rows.
    #[must_use]
    pub fn from_rows(rows: QueryRows) -> Self {
        let rows = rows.into_records();
        Self {
            count: rows.len(),
            rows,
            ..Self::default()
        }
    }

    /// Builds the data-shaped failure record.
    #[must_use]
    pub fn failed(error: impl Display, sql: Option<String>) -> Self {
        Self {
            error: Some(error.to_string()),
            sql,
            ..Self::default()
        }
    }

    /// Returns `true` if execution failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Headline registry statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryOverview {
    /// Patient count.
    pub total: i64,
    /// Patients recorded as male.
    pub male: i64,
    /// Patients recorded as female.
    pub female: i64,
    /// Mean age, one decimal place.
    pub avg_age: Option<f64>,
    /// Patients with an echo EF.
    pub with_echo: i64,
    /// Patients with an MRI EF.
    pub with_mri: i64,
}

/// Any tool result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    /// `registry_overview`.
    Overview(RegistryOverview),
    /// Query-shaped tools.
    Rows(RowSet),
}

impl ToolOutput {
    /// Row count for query-shaped results, `1` for the overview.
    #[must_use]
    pub const fn count(&self) -> usize {
        match self {
            Self::Overview(_) => 1,
            Self::Rows(rows) => rows.count,
        }
    }

    /// Execution error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Overview(_) => None,
            Self::Rows(rows) => rows.error.as_deref(),
        }
    }

    /// Serializes the record to JSON.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl From<RowSet> for ToolOutput {
    fn from(rows: RowSet) -> Self {
        Self::Rows(rows)
    }
}
