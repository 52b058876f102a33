//! Chat messages exchanged with model backends.
//!
//! [`ChatMessage`] is also the conversation history entry: callers hand the
//! orchestrator an ordered `&[ChatMessage]` of earlier user and assistant
//! turns, and the core only ever reads it.

use serde::{Deserialize, Serialize};

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Agent instructions.
    System,
    /// The clinician or analyst.
    User,
    /// A previous answer.
    Assistant,
}

impl Role {
    /// Name used when history is rendered into a prompt.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author.
    pub role: Role,
    /// Text.
    pub content: String,
}

impl ChatMessage {
    /// Creates a message.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// What an agent sends to its backend for one attempt.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Backend model name, e.g. `meditron:7b`.
    pub model: String,
    /// System prompt first, then the rendered user prompt.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Completion length cap.
    pub max_tokens: Option<u32>,
    /// Ask the backend for a JSON object.
    pub json_mode: bool,
}

/// Token accounting reported by the backend, zero when it reports none.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt side.
    pub prompt_tokens: u32,
    /// Completion side.
    pub completion_tokens: u32,
    /// Sum of both.
    pub total_tokens: u32,
}

/// A backend's answer to a [`ChatRequest`].
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    /// Completion text.
    pub content: String,
    /// Token accounting.
    pub usage: TokenUsage,
    /// Stop reason as reported, lowercased (`stop`, `length`, ...).
    pub finish_reason: Option<String>,
}

/// Shorthand for `ChatMessage::new(Role::System, content)`.
#[must_use]
pub fn system_message(content: &str) -> ChatMessage {
    ChatMessage::new(Role::System, content)
}

/// Shorthand for `ChatMessage::new(Role::User, content)`.
#[must_use]
pub fn user_message(content: &str) -> ChatMessage {
    ChatMessage::new(Role::User, content)
}

/// Shorthand for `ChatMessage::new(Role::Assistant, content)`.
#[must_use]
pub fn assistant_message(content: &str) -> ChatMessage {
    ChatMessage::new(Role::Assistant, content)
}
