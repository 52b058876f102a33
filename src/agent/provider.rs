//! The seam between agents and model backends.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse};
use crate::error::AgentError;

/// A backend that completes chat requests.
///
/// Implementations make exactly one attempt per call. Time boxes and
/// retries belong to [`invoke_with_retries`](super::retry::invoke_with_retries),
/// so a backend should not retry internally.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short backend identifier for logs.
    fn name(&self) -> &'static str;

    /// Sends one completion request.
    ///
    /// # Errors
    ///
    /// Transport failures map to [`AgentError::ApiRequest`] and unusable
    /// answers to [`AgentError::ResponseParse`].
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError>;
}
