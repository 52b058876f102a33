//! Retrieval agent: delegates note search to an external answer service.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::retry::{RetryPolicy, invoke_with_retries};
use super::traits::{AgentName, AgentResult, Turn};
use crate::error::AgentError;

const UNAVAILABLE_MESSAGE: &str = "RAG service is unavailable. Please try again later.";

/// An external service that answers questions from clinical notes.
#[async_trait]
pub trait RetrievalService: Send + Sync {
    /// Answers `question` from the indexed notes.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when the service cannot answer.
    async fn answer(&self, question: &str) -> Result<String, AgentError>;
}

/// Specialist for notes search. Reports unavailability instead of failing.
#[derive(Clone)]
pub struct RagAgent {
    service: Option<Arc<dyn RetrievalService>>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl fmt::Debug for RagAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RagAgent")
            .field("configured", &self.service.is_some())
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RagAgent {
    /// Creates a retrieval agent. `None` means no service is configured.
    #[must_use]
    pub fn new(
        service: Option<Arc<dyn RetrievalService>>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            service,
            retry,
            timeout,
        }
    }

    /// A retrieval agent with no service.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::new(None, RetryPolicy::no_retries(), Duration::ZERO)
    }

    /// Answers from the notes service, or reports it unavailable.
    pub async fn run(&self, turn: Turn<'_>) -> AgentResult {
        let Some(service) = &self.service else {
            return unavailable(None);
        };
        let answer = invoke_with_retries(&self.retry, self.timeout, || {
            service.answer(turn.message)
        })
        .await;
        match answer {
            Ok(answer) => AgentResult::new(AgentName::Rag, answer),
            Err(e) => {
                warn!(error = %e, "retrieval service failed");
                unavailable(Some(&e))
            }
        }
    }
}

fn unavailable(error: Option<&AgentError>) -> AgentResult {
    let result =
        AgentResult::new(AgentName::Rag, UNAVAILABLE_MESSAGE).with_metadata("rag", "unavailable");
    match error {
        Some(e) => result.with_metadata("error", e.to_string()),
        None => result,
    }
}
