//! Data agent: SQL and charts over the registry.
//!
//! A model drafts a small JSON plan that is sanitized and run through the
//! tool registry. When no model is configured, the call fails after
//! retries, or the answer is not a plan, the agent falls back to a closed
//! menu of parameterized query templates.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::prompt::build_data_prompt;
use super::tool::ToolCall;
use super::traits::{Agent, AgentName, AgentResult, ModelBackend, Turn};
use crate::core::literal_regex;
use crate::error::ToolError;
use crate::registry::{ChartMark, ChartOptions, RowSet, SanitizedQuery, ToolOutput, ToolRegistry};
use crate::storage::SqlValue;

const NO_HEURISTIC_MESSAGE: &str = "Ask about patient counts, averages, or registry statistics.";
const UNPARSED_PLAN_MESSAGE: &str =
    "I couldn't parse a structured plan. Please rephrase the request with desired chart or SQL details.";
const CHART_FIELDS_MESSAGE: &str = "Chart requests need sql, x, and y fields. Please clarify.";
const EMPTY_SQL_MESSAGE: &str = "Please provide a query intent so I can generate SQL.";
const NO_RESULTS_MESSAGE: &str = "Query executed but returned no results.";

/// Rows shown when narrating a multi-row result.
const SAMPLE_ROWS: usize = 5;

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| literal_regex(r"(?s)```(?:json)?\s*(.*?)\s*```"));

// A `with` prefix alone is ordinary prose ("With hypertension, ...").
static TYPED_SQL: LazyLock<Regex> =
    LazyLock::new(|| literal_regex(r"(?s)^(?:select\s|with\s.*\b(?:select|from)\b)"));

static CITY_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        literal_regex(r"count\s+of\s+([a-z\s-]+?)\s+people"),
        literal_regex(r"people\s+(?:in|from)\s+([a-z\s-]+)"),
        literal_regex(r"count\s+of\s+([a-z\s-]+?)\s+in\s+the\s+dataset"),
    ]
});

/// Words a city capture can collapse to that are not places.
const NOT_A_CITY: [&str; 4] = ["dataset", "registry", "database", "total"];

/// A query plan drafted by the model.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
struct DataPlan {
    action: Option<String>,
    sql: Option<String>,
    mark: Option<String>,
    x: Option<String>,
    y: Option<String>,
    color: Option<String>,
    title: Option<String>,
}

impl DataPlan {
    fn is_chart(&self) -> bool {
        self.action
            .as_deref()
            .is_some_and(|a| a.trim().eq_ignore_ascii_case("chart_from_sql"))
    }
}

/// Entries of the fallback menu.
#[derive(Debug, Clone, PartialEq)]
enum HeuristicQuery {
    /// The message itself is SQL.
    Passthrough(String),
    /// A fixed statement with bound parameters.
    Template {
        sql: &'static str,
        params: Vec<SqlValue>,
    },
    /// The `registry_overview` tool.
    Overview,
}

/// Specialist for registry statistics, SQL and charts.
#[derive(Debug, Clone)]
pub struct DataAgent {
    backend: Option<ModelBackend>,
    model: String,
    system_prompt: String,
    timeout: Duration,
    history_window: usize,
}

impl Agent for DataAgent {
    fn name(&self) -> &'static str {
        "data"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn json_mode(&self) -> bool {
        true
    }
}

impl DataAgent {
    /// Creates a data agent. Without a backend only the fallback menu runs.
    #[must_use]
    pub fn new(
        backend: Option<ModelBackend>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        timeout: Duration,
        history_window: usize,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            system_prompt: system_prompt.into(),
            timeout,
            history_window,
        }
    }

    /// Answers a data request.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnsafeSql`] when SQL typed by the user is
    /// rejected. SQL drafted by the model is never an error: a rejection is
    /// narrated instead.
    pub async fn run(
        &self,
        turn: Turn<'_>,
        tools: &ToolRegistry,
    ) -> Result<AgentResult, ToolError> {
        let mut unparsed_plan = false;

        if let Some(backend) = &self.backend {
            let prompt = build_data_prompt(turn, self.history_window);
            match self.execute(backend, &prompt).await {
                Ok(response) => match parse_plan(&response.content) {
                    Some(plan) => return Ok(self.run_plan(plan, tools).await),
                    None => {
                        warn!(
                            content = %response.content,
                            "data plan did not parse, using heuristics"
                        );
                        unparsed_plan = true;
                    }
                },
                Err(e) => warn!(error = %e, "data model unavailable, using heuristics"),
            }
        }

        self.run_heuristic(turn.message, tools, unparsed_plan).await
    }

    async fn run_plan(&self, plan: DataPlan, tools: &ToolRegistry) -> AgentResult {
        let sql = plan.sql.as_deref().map(str::trim).unwrap_or_default();
        let limit = tools.limits().default_limit;

        if plan.is_chart() {
            let (Some(x), Some(y)) = (plan.x.clone(), plan.y.clone()) else {
                return AgentResult::new(AgentName::Data, CHART_FIELDS_MESSAGE);
            };
            if sql.is_empty() {
                return AgentResult::new(AgentName::Data, CHART_FIELDS_MESSAGE);
            }
            let query = match tools.sanitize(sql, Some(limit)).await {
                Ok(query) => query,
                Err(e) => return rejected_plan(sql, &e),
            };
            let options = ChartOptions {
                mark: plan.mark.as_deref().map(ChartMark::from_name).unwrap_or_default(),
                x: Some(x),
                y: Some(y),
                color: plan.color.clone(),
                title: plan.title.clone().unwrap_or_else(|| ChartOptions::default().title),
                ..ChartOptions::default()
            };
            let rows = tools.run_chart(&query, &options).await;
            let call = ToolCall::new(
                "chart_from_sql",
                json!({
                    "sql": query.as_str(),
                    "limit": limit,
                    "mark": options.mark,
                    "x": options.x,
                    "y": options.y,
                    "color": options.color,
                    "title": options.title,
                }),
            );
            return chart_result(&options.title, rows, call);
        }

        if sql.is_empty() {
            return AgentResult::new(AgentName::Data, EMPTY_SQL_MESSAGE);
        }
        let query = match tools.sanitize(sql, Some(limit)).await {
            Ok(query) => query,
            Err(e) => return rejected_plan(sql, &e),
        };
        let rows = tools.run_query(&query, Vec::new()).await;
        let call = ToolCall::new("query_sql", json!({ "sql": query.as_str(), "limit": limit }));
        query_result(&query, rows, call)
    }

    async fn run_heuristic(
        &self,
        message: &str,
        tools: &ToolRegistry,
        unparsed_plan: bool,
    ) -> Result<AgentResult, ToolError> {
        let Some(heuristic) = heuristic_query(message) else {
            let text = if unparsed_plan {
                UNPARSED_PLAN_MESSAGE
            } else {
                NO_HEURISTIC_MESSAGE
            };
            return Ok(AgentResult::new(AgentName::Data, text));
        };
        debug!(?heuristic, "heuristic data query");

        let limit = tools.limits().default_limit;
        let result = match heuristic {
            HeuristicQuery::Overview => {
                let output = tools.overview().await;
                let call = ToolCall::new("registry_overview", json!({}));
                overview_result(&output, call)
            }
            HeuristicQuery::Passthrough(sql) => {
                let query = tools.sanitize(&sql, Some(limit)).await?;
                let rows = tools.run_query(&query, Vec::new()).await;
                let call =
                    ToolCall::new("query_sql", json!({ "sql": query.as_str(), "limit": limit }));
                query_result(&query, rows, call)
            }
            HeuristicQuery::Template { sql, params } => {
                let query = tools.sanitize(sql, Some(limit)).await?;
                let bound: Vec<Value> = params.iter().map(SqlValue::to_json).collect();
                let rows = tools.run_query(&query, params).await;
                let call = ToolCall::new(
                    "query_sql",
                    json!({ "sql": query.as_str(), "limit": limit, "params": bound }),
                );
                query_result(&query, rows, call)
            }
        };
        Ok(result.with_metadata("fallback", "heuristic"))
    }
}

/// Parses a plan from raw model output: direct JSON first, then a fenced
/// code block, then the first balanced `{...}` substring.
fn parse_plan(raw: &str) -> Option<DataPlan> {
    let value = extract_json(raw)?;
    serde_json::from_value(value).ok()
}

fn extract_json(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str(trimmed) {
        return Some(value);
    }
    if let Some(inner) = FENCED_JSON.captures(trimmed).and_then(|c| c.get(1))
        && let Ok(value @ Value::Object(_)) = serde_json::from_str(inner.as_str())
    {
        return Some(value);
    }
    let candidate = first_balanced_object(trimmed)?;
    match serde_json::from_str(candidate) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Returns the first `{...}` span whose braces balance, ignoring braces
/// inside JSON strings.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn extract_city(text: &str) -> Option<String> {
    CITY_PATTERNS.iter().find_map(|pattern| {
        let raw = pattern.captures(text)?.get(1)?.as_str();
        let cleaned = raw.trim();
        let cleaned = cleaned.strip_prefix("the ").unwrap_or(cleaned).trim();
        if cleaned.is_empty() || NOT_A_CITY.contains(&cleaned) {
            None
        } else {
            Some(cleaned.to_string())
        }
    })
}

/// Maps a message to an entry of the fallback menu. User text only ever
/// reaches SQL as a bound parameter or as a passthrough statement that is
/// still sanitized.
fn heuristic_query(message: &str) -> Option<HeuristicQuery> {
    let trimmed = message.trim();
    let text = trimmed.to_lowercase();

    if TYPED_SQL.is_match(&text) {
        return Some(HeuristicQuery::Passthrough(trimmed.to_string()));
    }

    let asks_count = text.contains("count") || text.contains("how many");
    if asks_count && let Some(city) = extract_city(&text) {
        return Some(HeuristicQuery::Template {
            sql: "SELECT COUNT(*) AS count FROM patients WHERE LOWER(current_city) = LOWER(?1)",
            params: vec![SqlValue::Text(city)],
        });
    }

    let template = |sql: &'static str| {
        Some(HeuristicQuery::Template {
            sql,
            params: Vec::new(),
        })
    };

    if text.contains("how many") || (text.contains("count") && text.contains("patient")) {
        return template("SELECT COUNT(*) AS count FROM ehvol");
    }
    if text.contains("average age") {
        return template("SELECT AVG(age) AS avg_age FROM ehvol WHERE age IS NOT NULL");
    }
    if text.contains("age distribution") {
        return template("SELECT age FROM ehvol WHERE age IS NOT NULL");
    }
    if text.contains("count") && text.contains("gender") {
        return template("SELECT gender, COUNT(*) AS count FROM ehvol GROUP BY gender");
    }
    if text.contains("average") && (text.contains(" ef") || text.contains("ejection")) {
        return template("SELECT AVG(echo_ef) AS avg_ef FROM ehvol WHERE echo_ef IS NOT NULL");
    }
    if text.contains("overview") || text.contains("summary") || text.contains("statistics") {
        return Some(HeuristicQuery::Overview);
    }
    None
}

fn rejected_plan(sql: &str, error: &ToolError) -> AgentResult {
    warn!(error = %error, sql, "model-drafted SQL rejected");
    AgentResult::new(
        AgentName::Data,
        format!(
            "The drafted query was rejected by the SQL safety policy ({error}). \
             Please rephrase the request."
        ),
    )
    .with_metadata("error", error.to_string())
}

/// Narrates a query result.
fn narrate(query: &SanitizedQuery, rows: &RowSet) -> String {
    if let Some(error) = &rows.error {
        return format!("Query executed: {query}\nThe query failed: {error}");
    }
    match rows.rows.as_slice() {
        [] => NO_RESULTS_MESSAGE.to_string(),
        [row] => format!("Query executed: {query}\nResult: {}", Value::Object(row.clone())),
        many => {
            let sample: Vec<Value> = many
                .iter()
                .take(SAMPLE_ROWS)
                .cloned()
                .map(Value::Object)
                .collect();
            format!(
                "Query executed: {query}\nReturned {} rows. Sample: {}",
                rows.count,
                Value::Array(sample)
            )
        }
    }
}

fn query_result(query: &SanitizedQuery, rows: RowSet, call: ToolCall) -> AgentResult {
    let mut result = AgentResult::new(AgentName::Data, narrate(query, &rows))
        .with_tool_call(call)
        .with_metadata("count", rows.count);
    if let Some(error) = rows.error {
        result = result.with_metadata("error", error);
    }
    result
}

fn chart_result(title: &str, rows: RowSet, call: ToolCall) -> AgentResult {
    let content = match &rows.error {
        Some(error) => format!("Chart '{title}' could not be generated: {error}"),
        None => format!("Generated chart '{title}' with {} rows.", rows.count),
    };
    let mut result = AgentResult::new(AgentName::Data, content)
        .with_tool_call(call)
        .with_metadata("count", rows.count);
    if let Some(spec) = rows.spec {
        result = result.with_metadata("chart", spec);
    }
    if let Some(error) = rows.error {
        result = result.with_metadata("error", error);
    }
    result
}

fn overview_result(output: &ToolOutput, call: ToolCall) -> AgentResult {
    let content = match output {
        ToolOutput::Overview(o) => {
            let avg = o
                .avg_age
                .map_or_else(|| "unknown".to_string(), |a| format!("{a:.1}"));
            format!(
                "Registry overview: {} patients ({} male, {} female), average age {avg}, \
                 {} with echo EF, {} with MRI EF.",
                o.total, o.male, o.female, o.with_echo, o.with_mri
            )
        }
        ToolOutput::Rows(rows) => format!(
            "Registry overview failed: {}",
            rows.error.as_deref().unwrap_or("no data")
        ),
    };
    let mut result = AgentResult::new(AgentName::Data, content)
        .with_tool_call(call)
        .with_metadata("overview", output.to_value());
    if let Some(error) = output.error() {
        result = result.with_metadata("error", error.to_string());
    }
    result
}
