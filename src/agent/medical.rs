//! Medical agent: direct clinical questions and the mandatory review of
//! other specialists' results.

use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use super::prompt::{build_combined_message, build_handoff_prompt, build_medical_prompt};
use super::traits::{Agent, AgentName, AgentResult, HANDOFF_FROM_KEY, ModelBackend, Turn};

const UNAVAILABLE_MESSAGE: &str =
    "The medical assistant is unavailable right now. Please try again later.";
const UNREVIEWED_CAUTION: &str =
    "Note: this answer has not been clinically reviewed because the medical assistant is unavailable.";

/// Metadata recording that the review step could not run.
const REVIEW_KEY: &str = "review";

/// Specialist for clinical reasoning. Never calls registry tools.
#[derive(Debug, Clone)]
pub struct MedicalAgent {
    backend: Option<ModelBackend>,
    model: String,
    system_prompt: String,
    handoff_prompt: String,
    timeout: Duration,
    history_window: usize,
}

impl Agent for MedicalAgent {
    fn name(&self) -> &'static str {
        "medical"
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

    fn temperature(&self) -> f32 {
        0.2
    }
}

/// The handoff review shares the model and timeout but not the system prompt.
struct HandoffReview<'a> {
    agent: &'a MedicalAgent,
}

impl Agent for HandoffReview<'_> {
    fn name(&self) -> &'static str {
        "medical_handoff"
    }

    fn model(&self) -> &str {
        &self.agent.model
    }

    fn system_prompt(&self) -> &str {
        &self.agent.handoff_prompt
    }

    fn timeout(&self) -> Duration {
        self.agent.timeout
    }

    fn temperature(&self) -> f32 {
        self.agent.temperature()
    }
}

impl MedicalAgent {
    /// Creates a medical agent. Without a backend every answer is the
    /// degraded-mode fallback.
    #[must_use]
    pub fn new(
        backend: Option<ModelBackend>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        handoff_prompt: impl Into<String>,
        timeout: Duration,
        history_window: usize,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            system_prompt: system_prompt.into(),
            handoff_prompt: handoff_prompt.into(),
            timeout,
            history_window,
        }
    }

    /// Answers a clinical question directly.
    pub async fn run(&self, turn: Turn<'_>) -> AgentResult {
        let prompt = build_medical_prompt(turn, self.history_window);
        self.answer(&prompt).await.map_or_else(
            || {
                AgentResult::new(AgentName::Medical, UNAVAILABLE_MESSAGE)
                    .with_metadata(REVIEW_KEY, "unavailable")
            },
            |content| AgentResult::new(AgentName::Medical, content),
        )
    }

    /// Reviews a specialist result with a prompt built from its summary,
    /// tool calls and metadata. The specialist's tool calls and metadata
    /// carry over, with `handoff_from` naming it.
    pub async fn run_handoff(&self, turn: Turn<'_>, specialist: AgentResult) -> AgentResult {
        let prompt = build_handoff_prompt(turn, self.history_window, &specialist);
        let review = HandoffReview { agent: self };
        let reviewed = match &self.backend {
            Some(backend) => match review.execute(backend, &prompt).await {
                Ok(response) => Some(response.content),
                Err(e) => {
                    warn!(error = %e, from = %specialist.agent, "medical handoff review failed");
                    None
                }
            },
            None => None,
        };
        wrap(specialist, reviewed)
    }

    /// Folds the specialist summary into the question and answers it as a
    /// direct question, keeping the specialist's tool calls and metadata.
    pub async fn run_combined(&self, turn: Turn<'_>, specialist: AgentResult) -> AgentResult {
        let combined = build_combined_message(turn.message, &specialist);
        let prompt = build_medical_prompt(Turn::new(&combined, turn.history), self.history_window);
        let reviewed = self.answer(&prompt).await;
        wrap(specialist, reviewed)
    }

    async fn answer(&self, prompt: &str) -> Option<String> {
        let backend = self.backend.as_ref()?;
        match self.execute(backend, prompt).await {
            Ok(response) => Some(response.content),
            Err(e) => {
                warn!(error = %e, "medical model unavailable");
                None
            }
        }
    }
}

fn wrap(specialist: AgentResult, reviewed: Option<String>) -> AgentResult {
    let from = specialist.agent;
    let (content, degraded) = match reviewed {
        Some(content) => (content, false),
        None => (format!("{UNREVIEWED_CAUTION}\n\n{}", specialist.content), true),
    };

    let mut metadata = specialist.metadata;
    metadata.insert(HANDOFF_FROM_KEY.to_string(), Value::from(from.as_str()));
    if degraded {
        metadata.insert(REVIEW_KEY.to_string(), Value::from("unavailable"));
    }

    AgentResult {
        content,
        agent: AgentName::Medical,
        tool_calls: specialist.tool_calls,
        metadata,
    }
}
