//! Builds the model backend named by [`AgentConfig::provider`].

use std::sync::Arc;

use crate::agent::config::AgentConfig;
use crate::agent::provider::LlmProvider;
use crate::error::AgentError;

/// Endpoint used for `provider = "ollama"` when no base URL is configured.
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Creates the configured backend.
///
/// | Provider | Backend |
/// |---|---|
/// | `openai` | any `OpenAI`-compatible API; needs a key or a base URL |
/// | `ollama` | the same client, defaulting to [`OLLAMA_BASE_URL`] |
///
/// Both require the `openai` feature. Provider names are case-insensitive.
///
/// # Errors
///
/// [`AgentError::ApiKeyMissing`] when `openai` has neither key nor base URL
/// (callers run degraded), [`AgentError::UnsupportedProvider`] otherwise.
pub fn create_provider(config: &AgentConfig) -> Result<Arc<dyn LlmProvider>, AgentError> {
    let name = config.provider.trim().to_ascii_lowercase();
    match name.as_str() {
        #[cfg(feature = "openai")]
        "openai" => {
            if !config.has_backend() {
                return Err(AgentError::ApiKeyMissing);
            }
            Ok(Arc::new(crate::agent::providers::OpenAiProvider::new(
                config.api_key.as_deref(),
                config.base_url.as_deref(),
            )))
        }
        #[cfg(feature = "openai")]
        "ollama" => Ok(Arc::new(crate::agent::providers::OpenAiProvider::new(
            config.api_key.as_deref(),
            Some(config.base_url.as_deref().unwrap_or(OLLAMA_BASE_URL)),
        ))),
        _ => Err(AgentError::UnsupportedProvider { name }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(provider: &str) -> AgentConfig {
        AgentConfig::builder()
            .provider(provider)
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    #[cfg(feature = "openai")]
    #[test]
    fn test_openai_with_key() {
        let config = AgentConfig::builder()
            .api_key("sk-test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let provider = create_provider(&config);
        assert_eq!(provider.map(|p| p.name()).ok(), Some("openai"));
    }

    #[cfg(feature = "openai")]
    #[test]
    fn test_openai_without_credentials_is_degraded() {
        assert!(matches!(
            create_provider(&config_for("openai")),
            Err(AgentError::ApiKeyMissing)
        ));
    }

    #[cfg(feature = "openai")]
    #[test]
    fn test_ollama_needs_no_credentials() {
        assert!(create_provider(&config_for(" Ollama ")).is_ok());
    }

    #[test]
    fn test_unknown_provider() {
        let result = create_provider(&config_for("vertex"));
        assert!(matches!(
            result,
            Err(AgentError::UnsupportedProvider { name }) if name == "vertex"
        ));
    }
}
