//! Tool call records and the registry tool catalogue.
//!
//! [`ToolCall`] is the audit record attached to an agent result for every
//! registry call that actually executed. [`ToolDefinition`] describes a tool
//! with a JSON Schema for its arguments, for catalogue listings.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A tool definition with a JSON Schema parameter description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match a registry handler).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: Value,
}

/// A registry invocation that ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name.
    pub name: String,
    /// Arguments as passed to the tool.
    pub arguments: Value,
}

impl ToolCall {
    /// Creates a call record.
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Definitions for every registry tool, sorted by name.
#[must_use]
pub fn registry_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        def_build_cohort(),
        def_chart_from_sql(),
        def_query_sql(),
        def_registry_overview(),
        def_search_patients(),
    ]
}

fn def_registry_overview() -> ToolDefinition {
    ToolDefinition {
        name: "registry_overview".to_string(),
        description: "Headline registry statistics: total, male and female counts, average \
                      age, and how many patients have echo or MRI measurements."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
    }
}

fn def_query_sql() -> ToolDefinition {
    ToolDefinition {
        name: "query_sql".to_string(),
        description: "Run a single read-only SELECT/WITH statement against the registry \
                      tables (patients, ehvol, patient_genomic_variants). A LIMIT is added \
                      when missing."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "sql": {
                    "type": "string",
                    "description": "SELECT or WITH statement. No semicolons."
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Row limit, capped by the registry maximum."
                }
            },
            "required": ["sql"],
            "additionalProperties": false
        }),
    }
}

fn def_search_patients() -> ToolDefinition {
    ToolDefinition {
        name: "search_patients".to_string(),
        description: "Find patients by name or DNA id, optionally filtered by gender and age \
                      range. Newest enrollments first."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "search": { "type": "string", "description": "Text matched against name or DNA id." },
                "gender": { "type": "string" },
                "age_min": { "type": "integer" },
                "age_max": { "type": "integer" },
                "limit": { "type": "integer", "minimum": 1, "default": 50 }
            },
            "additionalProperties": false
        }),
    }
}

fn def_build_cohort() -> ToolDefinition {
    ToolDefinition {
        name: "build_cohort".to_string(),
        description: "Select patients matching demographic and clinical filters. All filters \
                      are optional and combined with AND."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "age_min": { "type": "integer" },
                "age_max": { "type": "integer" },
                "gender": { "type": "string" },
                "has_diabetes": { "type": "boolean" },
                "has_hypertension": { "type": "boolean" },
                "has_echo": { "type": "boolean", "description": "Only true filters." },
                "has_mri": { "type": "boolean", "description": "Only true filters." },
                "has_imaging": { "type": "boolean" },
                "has_labs": { "type": "boolean" },
                "has_family_history": { "type": "boolean" },
                "region": { "type": "string", "description": "Matched against nationality, city and city category." },
                "has_genomics": { "type": "boolean", "description": "At least one linked genomic variant." },
                "limit": { "type": "integer", "minimum": 1, "default": 100 }
            },
            "additionalProperties": false
        }),
    }
}

fn def_chart_from_sql() -> ToolDefinition {
    ToolDefinition {
        name: "chart_from_sql".to_string(),
        description: "Run a read-only query and wrap the rows in a Vega-Lite v5 chart spec."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "sql": { "type": "string", "description": "SELECT or WITH statement. No semicolons." },
                "limit": { "type": "integer", "minimum": 1 },
                "mark": {
                    "type": "string",
                    "enum": ["bar", "line", "area", "point", "tick", "boxplot"],
                    "default": "bar"
                },
                "x": { "type": "string" },
                "y": { "type": "string" },
                "color": { "type": "string" },
                "title": { "type": "string", "default": "Chart" },
                "x_type": { "type": "string", "default": "ordinal" },
                "y_type": { "type": "string", "default": "quantitative" }
            },
            "required": ["sql"],
            "additionalProperties": false
        }),
    }
}
