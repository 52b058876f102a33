//! Tool registry: the fixed catalogue of registry operations.
//!
//! Free-form SQL goes through [`ToolRegistry::sanitize`] before it can run.
//! Sanitization failures and unknown tool names are errors; failures while
//! executing an accepted statement come back as a [`RowSet`] with `error`
//! set. Store calls run on tokio's blocking pool.

pub mod chart;
pub mod cohort;
pub mod output;
pub mod sanitize;

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::agent::tool::{ToolDefinition, registry_tool_definitions};
use crate::error::{StorageError, ToolError};
use crate::storage::{QueryRows, RelationalStore, SqlValue};

pub use chart::{ChartMark, ChartOptions};
pub use cohort::{BoundQuery, CohortFilters, PatientSearch};
pub use output::{RegistryOverview, RowSet, ToolOutput};
pub use sanitize::{SanitizedQuery, SqlPolicy};

/// Tool names, sorted.
pub const TOOL_NAMES: [&str; 5] = [
    "build_cohort",
    "chart_from_sql",
    "query_sql",
    "registry_overview",
    "search_patients",
];

const OVERVIEW_SQL: &str = "SELECT \
    COUNT(*) AS total, \
    COUNT(CASE WHEN LOWER(gender) IN ('male', 'm') THEN 1 END) AS male, \
    COUNT(CASE WHEN LOWER(gender) IN ('female', 'f') THEN 1 END) AS female, \
    ROUND(AVG(age), 1) AS avg_age, \
    COUNT(echo_ef) AS with_echo, \
    COUNT(mri_ef) AS with_mri \
    FROM patients";

/// Row limits applied by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryLimits {
    /// Limit for free-form SQL when the caller gives none.
    pub default_limit: u32,
    /// Hard cap for every tool.
    pub max_limit: u32,
    /// Default for `build_cohort`.
    pub cohort_default_limit: u32,
    /// Default for `search_patients`.
    pub search_default_limit: u32,
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self {
            default_limit: 200,
            max_limit: 500,
            cohort_default_limit: 100,
            search_default_limit: 50,
        }
    }
}

/// Executes registry tools against a [`RelationalStore`].
///
/// Cheap to clone; clones share the store and the cached column set.
#[derive(Clone)]
pub struct ToolRegistry {
    store: Arc<dyn RelationalStore>,
    policy: SqlPolicy,
    limits: RegistryLimits,
    patient_columns: Arc<OnceCell<HashSet<String>>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("policy", &self.policy)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SqlArgs {
    #[serde(default)]
    sql: String,
    limit: Option<u32>,
}

#[derive(Deserialize)]
struct ChartArgs {
    #[serde(default)]
    sql: String,
    limit: Option<u32>,
    #[serde(flatten)]
    options: ChartOptions,
}

impl ToolRegistry {
    /// Creates a registry with default limits.
    #[must_use]
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self::with_limits(store, RegistryLimits::default())
    }

    /// Creates a registry with explicit limits.
    #[must_use]
    pub fn with_limits(store: Arc<dyn RelationalStore>, limits: RegistryLimits) -> Self {
        Self {
            store,
            policy: SqlPolicy::registry(limits.max_limit),
            limits,
            patient_columns: Arc::new(OnceCell::new()),
        }
    }

    /// Returns the configured limits.
    #[must_use]
    pub const fn limits(&self) -> &RegistryLimits {
        &self.limits
    }

    /// Sorted tool names.
    #[must_use]
    pub fn list_tools(&self) -> Vec<&'static str> {
        TOOL_NAMES.to_vec()
    }

    /// Tool definitions with parameter schemas.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        registry_tool_definitions()
    }

    /// Rewrites column aliases, then validates `sql` against the policy.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnsafeSql`] if the statement is rejected.
    pub async fn sanitize(
        &self,
        sql: &str,
        limit: Option<u32>,
    ) -> Result<SanitizedQuery, ToolError> {
        let columns = self.patient_columns().await;
        let sql = sanitize::rewrite_column_aliases(sql, columns);
        let query = self
            .policy
            .sanitize(&sql, limit.unwrap_or(self.limits.default_limit))?;
        Ok(query)
    }

    /// Runs an accepted query with positional parameters.
    pub async fn run_query(&self, query: &SanitizedQuery, params: Vec<SqlValue>) -> RowSet {
        let sql = query.as_str().to_string();
        match self.blocking(move |store| store.query(&sql, &params)).await {
            Ok(rows) => RowSet::from_rows(rows),
            Err(e) => {
                warn!(error = %e, sql = %query, "SQL execution failed");
                RowSet::failed(e, Some(query.to_string()))
            }
        }
    }

    /// Runs an accepted query and attaches a Vega-Lite spec over its rows.
    pub async fn run_chart(&self, query: &SanitizedQuery, options: &ChartOptions) -> RowSet {
        let mut rows = self.run_query(query, Vec::new()).await;
        if !rows.is_error() {
            rows.spec = Some(options.to_vega_lite(&rows.rows));
        }
        rows
    }

    /// Headline registry statistics.
    pub async fn overview(&self) -> ToolOutput {
        match self.blocking(|store| store.query(OVERVIEW_SQL, &[])).await {
            Ok(rows) => ToolOutput::Overview(overview_from_rows(&rows)),
            Err(e) => {
                warn!(error = %e, "registry overview failed");
                RowSet::failed(e, Some(OVERVIEW_SQL.to_string())).into()
            }
        }
    }

    /// Searches patients by name, DNA id, gender and age.
    pub async fn search_patients(&self, search: &PatientSearch) -> RowSet {
        let query = search.to_query(self.limits.search_default_limit, self.limits.max_limit);
        self.run_bound(query).await
    }

    /// Selects the cohort matching `filters`.
    pub async fn build_cohort(&self, filters: &CohortFilters) -> RowSet {
        let query = filters.to_query(self.limits.cohort_default_limit, self.limits.max_limit);
        self.run_bound(query).await
    }

    /// Dispatches a tool by name with JSON arguments. `null` arguments are
    /// treated as `{}`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] for names outside the catalogue,
    /// [`ToolError::InvalidArguments`] when arguments do not decode, and
    /// [`ToolError::UnsafeSql`] when free-form SQL is rejected.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<ToolOutput, ToolError> {
        debug!(tool = name, "tool call");
        let arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        match name {
            "registry_overview" => Ok(self.overview().await),
            "query_sql" => {
                let args: SqlArgs = decode(name, arguments)?;
                let query = self.sanitize(&args.sql, args.limit).await?;
                Ok(self.run_query(&query, Vec::new()).await.into())
            }
            "search_patients" => {
                let args: PatientSearch = decode(name, arguments)?;
                Ok(self.search_patients(&args).await.into())
            }
            "build_cohort" => {
                let args: CohortFilters = decode(name, arguments)?;
                Ok(self.build_cohort(&args).await.into())
            }
            "chart_from_sql" => {
                let args: ChartArgs = decode(name, arguments)?;
                let query = self.sanitize(&args.sql, args.limit).await?;
                Ok(self.run_chart(&query, &args.options).await.into())
            }
            other => Err(ToolError::UnknownTool {
                name: other.to_string(),
            }),
        }
    }

    async fn run_bound(&self, query: BoundQuery) -> RowSet {
        let BoundQuery { sql, params } = query;
        let shown = sql.clone();
        match self.blocking(move |store| store.query(&sql, &params)).await {
            Ok(rows) => RowSet::from_rows(rows),
            Err(e) => {
                warn!(error = %e, "registry query failed");
                RowSet::failed(e, Some(shown))
            }
        }
    }

    async fn patient_columns(&self) -> &HashSet<String> {
        self.patient_columns
            .get_or_init(|| async {
                match self.blocking(|store| store.table_columns("patients")).await {
                    Ok(columns) => columns,
                    Err(e) => {
                        warn!(error = %e, "column introspection failed, alias rewriting disabled");
                        HashSet::new()
                    }
                }
            })
            .await
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&dyn RelationalStore) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| StorageError::Worker {
                message: e.to_string(),
            })?
    }
}

fn decode<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

fn overview_from_rows(rows: &QueryRows) -> RegistryOverview {
    let row = rows.rows.first().map(Vec::as_slice).unwrap_or_default();
    let int_at = |idx: usize| row.get(idx).and_then(Value::as_i64).unwrap_or(0);
    RegistryOverview {
        total: int_at(0),
        male: int_at(1),
        female: int_at(2),
        avg_age: row.get(3).and_then(Value::as_f64),
        with_echo: int_at(4),
        with_mri: int_at(5),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::error::SqlPolicyError;
    use crate::storage::SqliteStore;
    use serde_json::json;

    fn registry() -> ToolRegistry {
        let store = SqliteStore::in_memory().unwrap_or_else(|e| panic!("store: {e}"));
        store.init().unwrap_or_else(|e| panic!("init: {e}"));
        store.seed_sample().unwrap_or_else(|e| panic!("seed: {e}"));
        ToolRegistry::new(Arc::new(store))
    }

    fn rows(output: ToolOutput) -> RowSet {
        match output {
            ToolOutput::Rows(rows) => rows,
            ToolOutput::Overview(o) => panic!("expected rows, got overview {o:?}"),
        }
    }

    fn dna_ids(rows: &RowSet) -> Vec<String> {
        let mut ids: Vec<String> = rows
            .rows
            .iter()
            .filter_map(|r| r.get("dna_id").and_then(Value::as_str).map(String::from))
            .collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error() {
        let result = registry().call("drop_patients", Value::Null).await;
        assert!(matches!(result, Err(ToolError::UnknownTool { name }) if name == "drop_patients"));
    }

    #[tokio::test]
    async fn test_query_sql_rejects_unsafe_sql() {
        let result = registry()
            .call("query_sql", json!({ "sql": "SELECT * FROM patients; DROP TABLE patients" }))
            .await;
        assert!(matches!(
            result,
            Err(ToolError::UnsafeSql(SqlPolicyError::MultipleStatements))
        ));
    }

    #[tokio::test]
    async fn test_query_sql_never_reads_the_schema_catalogue() {
        let cases = [
            ("SELECT name, type FROM/**/sqlite_master", SqlPolicyError::Comment),
            (
                "SELECT name, type FROM\"sqlite_master\"",
                SqlPolicyError::DisallowedTable {
                    table: "sqlite_master".to_string(),
                },
            ),
        ];
        let registry = registry();
        for (sql, expected) in cases {
            let result = registry.call("query_sql", json!({ "sql": sql })).await;
            assert!(
                matches!(result, Err(ToolError::UnsafeSql(ref e)) if *e == expected),
                "{sql}"
            );
        }
    }

    #[tokio::test]
    async fn test_query_sql_missing_sql_is_empty() {
        let result = registry().call("query_sql", json!({})).await;
        assert!(matches!(result, Err(ToolError::UnsafeSql(SqlPolicyError::Empty))));
    }

    #[tokio::test]
    async fn test_query_sql_returns_rows() {
        let output = registry()
            .call("query_sql", json!({ "sql": "SELECT COUNT(*) AS count FROM patients" }))
            .await
            .unwrap_or_else(|e| panic!("call failed: {e}"));
        let rows = rows(output);
        assert_eq!(rows.count, 1);
        assert_eq!(rows.rows[0]["count"], 6);
        assert!(rows.error.is_none());
    }

    #[tokio::test]
    async fn test_execution_failure_is_data() {
        let output = registry()
            .call("query_sql", json!({ "sql": "SELECT no_such_column FROM patients" }))
            .await
            .unwrap_or_else(|e| panic!("call failed: {e}"));
        let rows = rows(output);
        assert_eq!(rows.count, 0);
        assert!(rows.rows.is_empty());
        assert!(rows.error.is_some());
        assert_eq!(
            rows.sql.as_deref(),
            Some("SELECT no_such_column FROM patients LIMIT 200")
        );
    }

    #[tokio::test]
    async fn test_city_alias_rewritten() {
        let output = registry()
            .call(
                "query_sql",
                json!({
                    "sql": "SELECT city, COUNT(*) AS n FROM patients GROUP BY city ORDER BY n DESC",
                    "limit": 1,
                }),
            )
            .await
            .unwrap_or_else(|e| panic!("call failed: {e}"));
        let rows = rows(output);
        assert_eq!(rows.count, 1);
        assert_eq!(rows.rows[0]["current_city"], "Beirut");
        assert_eq!(rows.rows[0]["n"], 3);
    }

    #[tokio::test]
    async fn test_registry_overview() {
        let output = registry()
            .call("registry_overview", json!({}))
            .await
            .unwrap_or_else(|e| panic!("call failed: {e}"));
        let ToolOutput::Overview(overview) = output else {
            panic!("expected overview");
        };
        assert_eq!(overview.total, 6);
        assert_eq!(overview.male, 3);
        assert_eq!(overview.female, 3);
        assert_eq!(overview.avg_age, Some(52.8));
        assert_eq!(overview.with_echo, 4);
        assert_eq!(overview.with_mri, 2);
    }

    #[tokio::test]
    async fn test_build_cohort_genomics_complement() {
        let registry = registry();
        let with = rows(
            registry
                .call("build_cohort", json!({ "has_genomics": true }))
                .await
                .unwrap_or_else(|e| panic!("call failed: {e}")),
        );
        let without = rows(
            registry
                .call("build_cohort", json!({ "has_genomics": false }))
                .await
                .unwrap_or_else(|e| panic!("call failed: {e}")),
        );
        assert_eq!(dna_ids(&with), vec!["P001", "P005"]);
        assert_eq!(dna_ids(&without), vec!["P002", "P003", "P004", "P006"]);
    }

    #[tokio::test]
    async fn test_build_cohort_combined_filters() {
        let output = registry()
            .call(
                "build_cohort",
                json!({ "gender": "FEMALE", "has_diabetes": true, "age_min": 50 }),
            )
            .await
            .unwrap_or_else(|e| panic!("call failed: {e}"));
        assert_eq!(dna_ids(&rows(output)), vec!["P001", "P005"]);
    }

    #[tokio::test]
    async fn test_build_cohort_imaging_labs_family_region() {
        let registry = registry();
        let no_imaging = registry
            .build_cohort(&CohortFilters {
                has_imaging: Some(false),
                ..CohortFilters::default()
            })
            .await;
        assert_eq!(dna_ids(&no_imaging), vec!["P003", "P004"]);

        let labs = registry
            .build_cohort(&CohortFilters {
                has_labs: Some(true),
                has_family_history: Some(true),
                ..CohortFilters::default()
            })
            .await;
        assert_eq!(dna_ids(&labs), vec!["P001", "P003", "P005"]);

        let region = registry
            .build_cohort(&CohortFilters {
                region: Some("jordan".to_string()),
                ..CohortFilters::default()
            })
            .await;
        assert_eq!(dna_ids(&region), vec!["P005"]);
    }

    #[tokio::test]
    async fn test_build_cohort_rejects_unknown_filter() {
        let result = registry()
            .call("build_cohort", json!({ "dna_id; DROP": 1 }))
            .await;
        assert!(matches!(result, Err(ToolError::InvalidArguments { .. })));
    }

    #[tokio::test]
    async fn test_search_patients_orders_newest_first() {
        let output = registry()
            .call("search_patients", json!({ "gender": "male", "limit": 2 }))
            .await
            .unwrap_or_else(|e| panic!("call failed: {e}"));
        let rows = rows(output);
        assert_eq!(rows.count, 2);
        assert_eq!(rows.rows[0]["dna_id"], "P006");
        assert_eq!(rows.rows[1]["dna_id"], "P004");
    }

    #[tokio::test]
    async fn test_search_patients_by_name() {
        let rows = registry()
            .search_patients(&PatientSearch {
                search: Some("haddad".to_string()),
                ..PatientSearch::default()
            })
            .await;
        assert_eq!(dna_ids(&rows), vec!["P001"]);
    }

    #[tokio::test]
    async fn test_chart_from_sql_builds_spec() {
        let output = registry()
            .call(
                "chart_from_sql",
                json!({
                    "sql": "SELECT gender, COUNT(*) AS n FROM patients GROUP BY gender",
                    "x": "gender",
                    "y": "n",
                    "title": "By gender"
                }),
            )
            .await
            .unwrap_or_else(|e| panic!("call failed: {e}"));
        let rows = rows(output);
        assert_eq!(rows.count, 2);
        let spec = rows.spec.unwrap_or_else(|| panic!("missing spec"));
        assert_eq!(spec["title"], "By gender");
        assert_eq!(spec["mark"], "bar");
        assert_eq!(spec["data"]["values"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_chart_failure_has_no_spec() {
        let output = registry()
            .call("chart_from_sql", json!({ "sql": "SELECT nope FROM ehvol" }))
            .await
            .unwrap_or_else(|e| panic!("call failed: {e}"));
        let rows = rows(output);
        assert!(rows.spec.is_none());
        assert!(rows.error.is_some());
    }

    #[tokio::test]
    async fn test_bound_params_in_heuristic_query() {
        let registry = registry();
        let query = registry
            .sanitize(
                "SELECT COUNT(*) AS count FROM patients WHERE LOWER(city) = LOWER(?1)",
                None,
            )
            .await
            .unwrap_or_else(|e| panic!("sanitize failed: {e}"));
        let rows = registry
            .run_query(&query, vec![SqlValue::from("beirut")])
            .await;
        assert_eq!(rows.rows[0]["count"], 3);
    }

    #[test]
    fn test_list_tools_sorted() {
        let store = SqliteStore::in_memory().unwrap_or_else(|e| panic!("store: {e}"));
        let registry = ToolRegistry::new(Arc::new(store));
        let names = registry.list_tools();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        let defined: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(defined, names);
    }
}
