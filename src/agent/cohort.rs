//! Cohort agent: turns a free-text request into `build_cohort` filters.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::tool::ToolCall;
use super::traits::{AgentName, AgentResult, Turn};
use crate::core::literal_regex;
use crate::registry::{CohortFilters, ToolRegistry};

static AGE_RANGE: LazyLock<Regex> =
    LazyLock::new(|| literal_regex(r"(\d{1,3})\s*[-–]\s*(\d{1,3})\s*years?"));
static FEMALE: LazyLock<Regex> = LazyLock::new(|| literal_regex(r"\bfemales?\b"));
static MALE: LazyLock<Regex> = LazyLock::new(|| literal_regex(r"\bmales?\b"));
static GENOMICS: LazyLock<Regex> = LazyLock::new(|| literal_regex(r"\b(?:genomic|variant)"));

/// Extracts cohort filters from `message`. Unmentioned criteria stay unset.
#[must_use]
pub fn extract_filters(message: &str) -> CohortFilters {
    let text = message.to_lowercase();
    let mut filters = CohortFilters::default();

    if let Some(caps) = AGE_RANGE.captures(&text) {
        let low = caps[1].parse::<i64>().ok();
        let high = caps[2].parse::<i64>().ok();
        if let (Some(low), Some(high)) = (low, high) {
            filters.age_min = Some(low.min(high));
            filters.age_max = Some(low.max(high));
        }
    }

    if FEMALE.is_match(&text) {
        filters.gender = Some("female".to_string());
    } else if MALE.is_match(&text) {
        filters.gender = Some("male".to_string());
    }

    let flag = |needle: &str| text.contains(needle).then_some(true);
    filters.has_diabetes = flag("diabetes");
    filters.has_hypertension = flag("hypertension");
    filters.has_echo = flag("echo");
    filters.has_mri = flag("mri");
    filters.has_genomics = GENOMICS.is_match(&text).then_some(true);

    filters
}

/// Specialist for cohort building. Never calls a model.
#[derive(Debug, Clone, Copy, Default)]
pub struct CohortAgent;

impl CohortAgent {
    /// Builds the cohort described by the message.
    pub async fn run(self, turn: Turn<'_>, tools: &ToolRegistry) -> AgentResult {
        let filters = extract_filters(turn.message);
        let rows = tools.build_cohort(&filters).await;
        let arguments = serde_json::to_value(&filters).unwrap_or(Value::Null);

        let content = match &rows.error {
            Some(error) => format!("Cohort query failed: {error}"),
            None => format!("Built cohort with {} patients.", rows.count),
        };

        let mut result = AgentResult::new(AgentName::Cohort, content)
            .with_tool_call(ToolCall::new("build_cohort", arguments.clone()))
            .with_metadata("count", rows.count)
            .with_metadata("filters", arguments);
        if let Some(error) = rows.error {
            result = result.with_metadata("error", error);
        }
        result
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use serde_json::json;
    use std::sync::Arc;

    fn registry() -> ToolRegistry {
        let store = SqliteStore::in_memory().unwrap_or_else(|e| panic!("store: {e}"));
        store.init().unwrap_or_else(|e| panic!("init: {e}"));
        store.seed_sample().unwrap_or_else(|e| panic!("seed: {e}"));
        ToolRegistry::new(Arc::new(store))
    }

    #[test]
    fn test_extract_age_range_and_gender() {
        let filters = extract_filters("Patients 40–60 years, males only");
        assert_eq!(filters.age_min, Some(40));
        assert_eq!(filters.age_max, Some(60));
        assert_eq!(filters.gender.as_deref(), Some("male"));
    }

    #[test]
    fn test_female_wins_over_male() {
        let filters = extract_filters("compare female and male patients");
        assert_eq!(filters.gender.as_deref(), Some("female"));
    }

    #[test]
    fn test_flags() {
        let filters = extract_filters("Cohort with diabetes, hypertension, echo and MRI");
        assert_eq!(filters.has_diabetes, Some(true));
        assert_eq!(filters.has_hypertension, Some(true));
        assert_eq!(filters.has_echo, Some(true));
        assert_eq!(filters.has_mri, Some(true));
        assert_eq!(filters.has_genomics, None);
        assert_eq!(filters.gender, None);
    }

    #[test]
    fn test_no_criteria() {
        assert_eq!(extract_filters("build a cohort"), CohortFilters::default());
    }

    #[tokio::test]
    async fn test_run_females_with_diabetes() {
        let result = CohortAgent
            .run(Turn::new("Build a cohort of females with diabetes", &[]), &registry())
            .await;
        assert_eq!(result.content, "Built cohort with 3 patients.");
        assert_eq!(result.tool_names(), vec!["build_cohort"]);
        assert_eq!(
            result.tool_calls[0].arguments,
            json!({"gender": "female", "has_diabetes": true})
        );
        assert_eq!(result.metadata["count"], json!(3));
    }

    #[tokio::test]
    async fn test_run_genomics_cohort() {
        let result = CohortAgent
            .run(Turn::new("Cohort of patients with genomic variants", &[]), &registry())
            .await;
        assert_eq!(result.content, "Built cohort with 2 patients.");
        assert_eq!(result.tool_calls[0].arguments, json!({"has_genomics": true}));
    }
}
