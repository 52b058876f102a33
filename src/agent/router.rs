//! LLM re-classification for messages the keyword classifier calls `general`.

use std::time::Duration;

use tracing::{debug, warn};

use super::prompt::build_router_prompt;
use super::traits::{Agent, ModelBackend, Turn};
use crate::core::Intent;

/// Asks a model to pick one intent label.
#[derive(Debug, Clone)]
pub struct LlmRouter {
    backend: ModelBackend,
    model: String,
    system_prompt: String,
    timeout: Duration,
    history_window: usize,
}

impl LlmRouter {
    /// Creates a router.
    #[must_use]
    pub fn new(
        backend: ModelBackend,
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

    /// Returns the model's intent, or `None` if the call failed or the
    /// answer is not a recognized label.
    pub async fn route(&self, turn: Turn<'_>) -> Option<Intent> {
        let prompt = build_router_prompt(turn, self.history_window);
        match self.execute(&self.backend, &prompt).await {
            Ok(response) => {
                let intent = parse_label(&response.content);
                debug!(raw = %response.content.trim(), ?intent, "router answered");
                intent
            }
            Err(e) => {
                warn!(error = %e, "router unavailable, keeping heuristic intent");
                None
            }
        }
    }
}

impl Agent for LlmRouter {
    fn name(&self) -> &'static str {
        "router"
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

    fn max_tokens(&self) -> u32 {
        8
    }
}

/// Lowercases, strips everything but ASCII letters, and maps synonyms.
fn parse_label(raw: &str) -> Option<Intent> {
    let cleaned: String = raw
        .to_ascii_lowercase()
        .chars()
        .filter(char::is_ascii_lowercase)
        .collect();
    Intent::parse(&cleaned)
}
