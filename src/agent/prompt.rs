//! System prompts and template builders for agents.
//!
//! System prompts define each model role. Builders format the per-turn user
//! message: the recent history window, the question, and for handoffs the
//! specialist's summary with its tool calls and metadata.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use super::message::ChatMessage;
use super::traits::{AgentResult, Turn};

/// System prompt for the LLM router.
pub const ROUTER_SYSTEM_PROMPT: &str = r"You are an orchestrator for a clinical patient registry assistant. Route the user request to exactly one intent from: data, medical, rag, cohort, ui, general.

- data: counts, averages, statistics, SQL, charts over registry data.
- medical: clinical reasoning, guidelines, interpretation of findings.
- rag: searching free-text clinical notes or documents.
- cohort: building a filtered group of patients.
- ui: navigating to a screen of the application.
- general: anything else.

Return ONLY the intent string.";

/// System prompt for the data agent's query planner.
pub const DATA_SYSTEM_PROMPT: &str = r#"You are a data agent for a clinical patient registry. Decide whether to generate SQL or a chart.

## Schema

- `patients`: dna_id, mrn, name, age, gender, nationality, current_city, current_city_category, diabetes_mellitus, high_blood_pressure, echo_ef, mri_ef, hba1c, troponin_i, history_sudden_death, history_premature_cad, enrollment_date
- `ehvol`: summary view over the same columns
- `patient_genomic_variants`: dna_id, gene, variant, classification

## Output Format (JSON)

```json
{"action": "query_sql" | "chart_from_sql", "sql": "...", "mark": "bar", "x": "column", "y": "column", "color": null, "title": "..."}
```

## Rules

- Use only the tables listed above.
- SQL must be a single SELECT statement. No semicolons.
- For charts, `sql`, `x` and `y` are required; `mark` is one of bar, line, area, point, tick, boxplot.
- Return ONLY the JSON object, no surrounding text."#;

/// System prompt for direct medical questions.
pub const MEDICAL_SYSTEM_PROMPT: &str = r"You are a careful medical assistant. Provide evidence-based guidance, be explicit about uncertainty, and avoid giving definitive diagnoses. If a question requires patient-specific data, ask clarifying questions.";

/// System prompt for reviewing another agent's result.
pub const HANDOFF_SYSTEM_PROMPT: &str = r"You are a medical reasoning assistant. A specialist agent already executed tools and gathered data. Use the tool results to provide the final response. Be explicit about uncertainty and avoid definitive diagnoses. If results are insufficient, ask concise clarifying questions. Never invent records or values that are not present in the tool results.";

/// Default prompt directory under user config.
const DEFAULT_PROMPT_DIR: &str = ".config/biolink-rs/prompts";

/// Filename for the router prompt template.
const ROUTER_FILENAME: &str = "router.md";
/// Filename for the data prompt template.
const DATA_FILENAME: &str = "data.md";
/// Filename for the medical prompt template.
const MEDICAL_FILENAME: &str = "medical.md";
/// Filename for the handoff prompt template.
const HANDOFF_FILENAME: &str = "handoff.md";

/// Rendered in place of an empty section.
const NONE_MARKER: &str = "None";

/// A set of system prompts for all model roles.
///
/// Loaded from external template files when available, falling back to
/// compiled-in defaults.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// System prompt for the LLM router.
    pub router: String,
    /// System prompt for the data agent.
    pub data: String,
    /// System prompt for direct medical questions.
    pub medical: String,
    /// System prompt for handoff review.
    pub handoff: String,
}

impl PromptSet {
    /// Loads prompts from the given directory, falling back to compiled-in defaults.
    ///
    /// Resolution order for `prompt_dir`:
    /// 1. Explicit `prompt_dir` argument
    /// 2. `BIOLINK_PROMPT_DIR` environment variable
    /// 3. `~/.config/biolink-rs/prompts/`
    ///
    /// Each file is loaded independently; a missing file uses its default.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(PathBuf::from)
            .or_else(|| std::env::var("BIOLINK_PROMPT_DIR").ok().map(PathBuf::from))
            .or_else(Self::default_dir);

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            router: load_file(ROUTER_FILENAME, ROUTER_SYSTEM_PROMPT),
            data: load_file(DATA_FILENAME, DATA_SYSTEM_PROMPT),
            medical: load_file(MEDICAL_FILENAME, MEDICAL_SYSTEM_PROMPT),
            handoff: load_file(HANDOFF_FILENAME, HANDOFF_SYSTEM_PROMPT),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            router: ROUTER_SYSTEM_PROMPT.to_string(),
            data: DATA_SYSTEM_PROMPT.to_string(),
            medical: MEDICAL_SYSTEM_PROMPT.to_string(),
            handoff: HANDOFF_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Writes the compiled-in default prompts to `dir`, skipping files that
    /// already exist.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let templates = [
            (ROUTER_FILENAME, ROUTER_SYSTEM_PROMPT),
            (DATA_FILENAME, DATA_SYSTEM_PROMPT),
            (MEDICAL_FILENAME, MEDICAL_SYSTEM_PROMPT),
            (HANDOFF_FILENAME, HANDOFF_SYSTEM_PROMPT),
        ];

        let mut written = Vec::new();
        for (filename, content) in &templates {
            let path = dir.join(filename);
            if !path.exists() {
                std::fs::write(&path, content)?;
                written.push(path);
            }
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's home.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}

/// Renders the last `window` history messages as `role: content` lines.
#[must_use]
pub fn render_history(history: &[ChatMessage], window: usize) -> String {
    let start = history.len().saturating_sub(window);
    let recent = &history[start..];
    if recent.is_empty() {
        return NONE_MARKER.to_string();
    }
    let mut out = String::new();
    for (i, msg) in recent.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{}: {}", msg.role.as_str(), msg.content);
    }
    out
}

/// Builds the user message for the router.
#[must_use]
pub fn build_router_prompt(turn: Turn<'_>, window: usize) -> String {
    format!(
        "Conversation history:\n{}\n\nUser request: {}\n",
        render_history(turn.history, window),
        turn.message
    )
}

/// Builds the user message for the data agent's planner.
#[must_use]
pub fn build_data_prompt(turn: Turn<'_>, window: usize) -> String {
    format!(
        "Conversation history:\n{}\n\nUser request: {}\n",
        render_history(turn.history, window),
        turn.message
    )
}

/// Builds the user message for a direct medical question.
#[must_use]
pub fn build_medical_prompt(turn: Turn<'_>, window: usize) -> String {
    format!(
        "Conversation history:\n{}\n\nUser question: {}\n",
        render_history(turn.history, window),
        turn.message
    )
}

/// Builds the handoff review message: question, history, and the
/// specialist's summary, tool calls and metadata.
#[must_use]
pub fn build_handoff_prompt(turn: Turn<'_>, window: usize, result: &AgentResult) -> String {
    let mut prompt = format!(
        "Conversation history:\n{}\n\n\
         User question: {}\n\n\
         Specialist agent: {}\n\
         Specialist summary:\n{}\n\n\
         Tool calls:\n",
        render_history(turn.history, window),
        turn.message,
        result.agent,
        result.content,
    );

    if result.tool_calls.is_empty() {
        prompt.push_str(NONE_MARKER);
    } else {
        for (i, call) in result.tool_calls.iter().enumerate() {
            if i > 0 {
                prompt.push('\n');
            }
            let _ = write!(prompt, "- {}: {}", call.name, call.arguments);
        }
    }

    prompt.push_str("\n\nMetadata:\n");
    if result.metadata.is_empty() {
        prompt.push_str(NONE_MARKER);
    } else {
        let metadata = serde_json::to_string_pretty(&result.metadata)
            .unwrap_or_else(|_| NONE_MARKER.to_string());
        prompt.push_str(&metadata);
    }
    prompt.push('\n');
    prompt
}

/// Folds a specialist's summary into the question for a plain medical run.
#[must_use]
pub fn build_combined_message(message: &str, result: &AgentResult) -> String {
    format!(
        "User question: {message}\n\nSpecialist agent ({}) summary:\n{}",
        result.agent, result.content
    )
}
