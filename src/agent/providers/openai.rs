//! Backend for `OpenAI`-compatible chat completion endpoints.
//!
//! One client type serves the hosted API, Azure deployments and local
//! servers such as Ollama's `/v1` endpoint; only the base URL and key differ.
//! The SDK's own rate-limit backoff is disabled: each `chat` is one HTTP
//! attempt, and [`crate::agent::retry`] owns retries.

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    CreateChatCompletionResponse, ResponseFormat,
};
use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use tracing::debug;

use crate::agent::message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
use crate::agent::provider::LlmProvider;
use crate::error::AgentError;

/// Chat completions over an `OpenAI`-compatible HTTP API.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    endpoint: Option<String>,
}

impl OpenAiProvider {
    /// Creates a client. Local servers accept an empty key.
    #[must_use]
    pub fn new(api_key: Option<&str>, base_url: Option<&str>) -> Self {
        let mut sdk_config = OpenAIConfig::new().with_api_key(api_key.unwrap_or_default());
        if let Some(url) = base_url {
            sdk_config = sdk_config.with_api_base(url);
        }
        Self {
            client: Client::with_config(sdk_config).with_backoff(single_attempt()),
            endpoint: base_url.map(str::to_string),
        }
    }
}

/// A backoff that never grants a second attempt.
fn single_attempt() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("endpoint", &self.endpoint.as_deref().unwrap_or("default"))
            .finish_non_exhaustive()
    }
}

fn sdk_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
    let text = msg.content.clone();
    match msg.role {
        Role::System => ChatCompletionRequestSystemMessage {
            content: ChatCompletionRequestSystemMessageContent::Text(text),
            name: None,
        }
        .into(),
        Role::User => ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(text),
            name: None,
        }
        .into(),
        #[allow(deprecated)]
        Role::Assistant => ChatCompletionRequestAssistantMessage {
            content: Some(ChatCompletionRequestAssistantMessageContent::Text(text)),
            name: None,
            tool_calls: None,
            refusal: None,
            audio: None,
            function_call: None,
        }
        .into(),
    }
}

fn completion_request(request: &ChatRequest) -> CreateChatCompletionRequest {
    CreateChatCompletionRequest {
        model: request.model.clone(),
        messages: request.messages.iter().map(sdk_message).collect(),
        temperature: request.temperature,
        max_completion_tokens: request.max_tokens,
        response_format: request.json_mode.then_some(ResponseFormat::JsonObject),
        ..Default::default()
    }
}

/// Takes the first choice. An answer with no text counts as unparseable so
/// the retry policy treats it like any other failed attempt.
fn into_chat_response(response: CreateChatCompletionResponse) -> Result<ChatResponse, AgentError> {
    let usage = response.usage.map_or_else(TokenUsage::default, |u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });
    let choice = response.choices.into_iter().next();
    let finish_reason = choice
        .as_ref()
        .and_then(|c| c.finish_reason.as_ref())
        .map(|reason| format!("{reason:?}").to_lowercase());
    let content = choice.and_then(|c| c.message.content).unwrap_or_default();

    if content.trim().is_empty() {
        return Err(AgentError::ResponseParse {
            message: "completion has no text".to_string(),
            content,
        });
    }
    Ok(ChatResponse {
        content,
        usage,
        finish_reason,
    })
}

fn agent_error(err: OpenAIError) -> AgentError {
    match err {
        OpenAIError::JSONDeserialize(e) => AgentError::ResponseParse {
            message: e.to_string(),
            content: String::new(),
        },
        OpenAIError::ApiError(e) => AgentError::ApiRequest {
            status: None,
            message: match (&e.r#type, &e.code) {
                (Some(kind), Some(code)) => format!("{kind} ({code}): {}", e.message),
                (Some(kind), None) => format!("{kind}: {}", e.message),
                (None, Some(code)) => format!("{code}: {}", e.message),
                (None, None) => e.message,
            },
        },
        OpenAIError::Reqwest(e) => AgentError::ApiRequest {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        },
        other => AgentError::ApiRequest {
            message: other.to_string(),
            status: None,
        },
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let response = self
            .client
            .chat()
            .create(completion_request(request))
            .await
            .map_err(agent_error)?;
        let response = into_chat_response(response)?;
        debug!(
            model = %request.model,
            total_tokens = response.usage.total_tokens,
            finish_reason = response.finish_reason.as_deref().unwrap_or("unknown"),
            "completion received"
        );
        Ok(response)
    }
}
