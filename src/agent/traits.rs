//! Agent trait and the result types shared by every specialist.
//!
//! Model-backed agents (router, data planner, medical) implement [`Agent`],
//! which builds the chat request and sends it through the retry policy.
//! Every specialist, model-backed or not, produces an [`AgentResult`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::message::{ChatMessage, ChatRequest, ChatResponse, system_message, user_message};
use super::provider::LlmProvider;
use super::retry::{RetryPolicy, invoke_with_retries};
use super::tool::ToolCall;
use crate::core::Intent;
use crate::error::AgentError;

/// Metadata key naming the specialist whose result was handed off.
pub const HANDOFF_FROM_KEY: &str = "handoff_from";

/// A provider paired with the retry policy every call through it uses.
#[derive(Clone)]
pub struct ModelBackend {
    provider: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
}

impl ModelBackend {
    /// Wraps a provider.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }

    /// The underlying provider.
    #[must_use]
    pub fn provider(&self) -> &dyn LlmProvider {
        self.provider.as_ref()
    }

    /// The retry policy.
    #[must_use]
    pub const fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}

impl fmt::Debug for ModelBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBackend")
            .field("provider", &self.provider.name())
            .field("retry", &self.retry)
            .finish()
    }
}

/// A model role: fixed system prompt, model and per-attempt time box.
///
/// [`Agent::execute`] is the only path from an agent to its backend, so
/// every model call is retried and timed the same way.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &'static str;

    /// Backend model name.
    fn model(&self) -> &str;

    /// Instructions sent as the system message.
    fn system_prompt(&self) -> &str;

    /// Per-attempt time box.
    fn timeout(&self) -> Duration;

    /// Ask the backend for a JSON object.
    fn json_mode(&self) -> bool {
        false
    }

    /// Sampling temperature.
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Completion length cap.
    fn max_tokens(&self) -> u32 {
        1024
    }

    /// Sends `prompt` under this agent's system prompt.
    ///
    /// # Errors
    ///
    /// The last attempt's [`AgentError`] once retries are exhausted.
    async fn execute(
        &self,
        backend: &ModelBackend,
        prompt: &str,
    ) -> Result<ChatResponse, AgentError> {
        let request = ChatRequest {
            model: self.model().to_string(),
            messages: vec![system_message(self.system_prompt()), user_message(prompt)],
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            json_mode: self.json_mode(),
        };

        let response = invoke_with_retries(backend.retry(), self.timeout(), || {
            backend.provider().chat(&request)
        })
        .await?;
        debug!(
            agent = self.name(),
            backend = backend.provider().name(),
            total_tokens = response.usage.total_tokens,
            "model call succeeded"
        );
        Ok(response)
    }
}

/// Names of the specialist agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentName {
    /// SQL and charts over the registry.
    Data,
    /// Clinical reasoning and handoff review.
    Medical,
    /// Notes retrieval.
    Rag,
    /// Cohort builder.
    Cohort,
    /// Navigation guidance.
    Ui,
    /// Fallback guidance.
    General,
}

impl AgentName {
    /// Lowercase agent name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Medical => "medical",
            Self::Rag => "rag",
            Self::Cohort => "cohort",
            Self::Ui => "ui",
            Self::General => "general",
        }
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Intent> for AgentName {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::Data => Self::Data,
            Intent::Medical => Self::Medical,
            Intent::Rag => Self::Rag,
            Intent::Cohort => Self::Cohort,
            Intent::Ui => Self::Ui,
            Intent::General => Self::General,
        }
    }
}

/// Output of one specialist run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    /// User-facing text.
    pub content: String,
    /// Agent that produced this result.
    pub agent: AgentName,
    /// Registry calls that executed, in order.
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    /// Agent-specific structured data (counts, chart specs, fallbacks).
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl AgentResult {
    /// A result with no tool calls or metadata.
    #[must_use]
    pub fn new(agent: AgentName, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            agent,
            tool_calls: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Appends an executed tool call.
    #[must_use]
    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_calls.push(call);
        self
    }

    /// Sets a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Name of the specialist this result was handed off from, if any.
    #[must_use]
    pub fn handoff_from(&self) -> Option<&str> {
        self.metadata.get(HANDOFF_FROM_KEY).and_then(Value::as_str)
    }

    /// Names of the executed tool calls.
    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        self.tool_calls.iter().map(|call| call.name.as_str()).collect()
    }
}

/// One user turn: the message and the caller-owned history before it.
#[derive(Debug, Clone, Copy)]
pub struct Turn<'a> {
    /// The current user message.
    pub message: &'a str,
    /// Earlier messages, oldest first.
    pub history: &'a [ChatMessage],
}

impl<'a> Turn<'a> {
    /// Creates a turn.
    #[must_use]
    pub const fn new(message: &'a str, history: &'a [ChatMessage]) -> Self {
        Self { message, history }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_name_from_intent() {
        for intent in Intent::ALL {
            assert_eq!(AgentName::from(intent).as_str(), intent.as_str());
        }
    }

    #[test]
    fn test_result_builders() {
        let result = AgentResult::new(AgentName::Data, "6 patients")
            .with_tool_call(ToolCall::new("query_sql", json!({"sql": "SELECT 1"})))
            .with_metadata("count", 1)
            .with_metadata(HANDOFF_FROM_KEY, "data");
        assert_eq!(result.tool_names(), vec!["query_sql"]);
        assert_eq!(result.metadata["count"], json!(1));
        assert_eq!(result.handoff_from(), Some("data"));
    }

    #[test]
    fn test_result_serializes_agent_lowercase() {
        let value = serde_json::to_value(AgentResult::new(AgentName::Ui, "hi"))
            .unwrap_or_default();
        assert_eq!(value["agent"], json!("ui"));
        assert_eq!(value["tool_calls"], json!([]));
    }
}
