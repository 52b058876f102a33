//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::retry::RetryPolicy;
use crate::error::ConfigError;
use crate::registry::RegistryLimits;

/// Default model for routing and data planning.
const DEFAULT_GENERAL_MODEL: &str = "llama3.1:8b";
/// Default model for medical review.
const DEFAULT_MEDICAL_MODEL: &str = "meditron:7b";
/// Default router timeout in seconds.
const DEFAULT_ROUTER_TIMEOUT_SECS: u64 = 10;
/// Default data-agent timeout in seconds.
const DEFAULT_DATA_TIMEOUT_SECS: u64 = 20;
/// Default medical-agent timeout in seconds. The medical model is the slowest.
const DEFAULT_MEDICAL_TIMEOUT_SECS: u64 = 60;
/// Default max retries after the first attempt.
const DEFAULT_MAX_RETRIES: u32 = 2;
/// Default base backoff in milliseconds.
const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
/// Default jitter bound in milliseconds.
const DEFAULT_RETRY_JITTER_MS: u64 = 250;
/// Default number of history messages included in prompts.
const DEFAULT_HISTORY_WINDOW: usize = 6;

/// How a specialist result is passed to the medical agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandoffMode {
    /// Dedicated handoff prompt with tool calls and metadata rendered.
    #[default]
    Structured,
    /// Specialist summary folded into the question for a plain medical run.
    Combined,
}

impl HandoffMode {
    /// Lowercase mode name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Combined => "combined",
        }
    }
}

impl fmt::Display for HandoffMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandoffMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" => Ok(Self::Structured),
            "combined" => Ok(Self::Combined),
            _ => Err(ConfigError::InvalidValue {
                key: "handoff_mode".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider. Local `OpenAI`-compatible servers may not
    /// need one when `base_url` is set.
    pub api_key: Option<String>,
    /// Optional base URL override (Ollama's `/v1`, proxies, Azure).
    pub base_url: Option<String>,
    /// Model for the LLM router.
    pub router_model: String,
    /// Model for the data agent's query planning.
    pub data_model: String,
    /// Model for the medical agent.
    pub medical_model: String,
    /// Per-attempt timeout for router calls.
    pub router_timeout: Duration,
    /// Per-attempt timeout for data-agent calls, also applied to the
    /// retrieval service.
    pub data_timeout: Duration,
    /// Per-attempt timeout for medical-agent calls.
    pub medical_timeout: Duration,
    /// Retries after the first attempt, shared by every model role.
    pub max_retries: u32,
    /// Base delay before the first retry.
    pub retry_backoff: Duration,
    /// Upper bound of the jitter added to each retry delay.
    pub retry_jitter: Duration,
    /// Whether `general` classifications are re-checked by the LLM router.
    pub use_llm_router: bool,
    /// Limit for free-form SQL when none is requested.
    pub sql_default_limit: u32,
    /// Hard cap on rows returned by any tool.
    pub sql_max_limit: u32,
    /// Default row count for cohorts.
    pub cohort_default_limit: u32,
    /// History messages included in prompts.
    pub history_window: usize,
    /// How specialist results reach the medical agent.
    pub handoff_mode: HandoffMode,
    /// Directory containing prompt template files.
    ///
    /// Missing files fall back to compiled-in defaults.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if an environment variable or
    /// the resulting limits are malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder().from_env()?.build()
    }

    /// Retry policy applied to every model call.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_backoff, self.retry_jitter)
    }

    /// Row limits for the tool registry.
    #[must_use]
    pub fn registry_limits(&self) -> RegistryLimits {
        RegistryLimits {
            default_limit: self.sql_default_limit,
            max_limit: self.sql_max_limit,
            cohort_default_limit: self.cohort_default_limit,
            ..RegistryLimits::default()
        }
    }

    /// Whether the `openai` provider has a key or base URL to connect with.
    #[must_use]
    pub const fn has_backend(&self) -> bool {
        self.api_key.is_some() || self.base_url.is_some()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    router_model: Option<String>,
    data_model: Option<String>,
    medical_model: Option<String>,
    router_timeout: Option<Duration>,
    data_timeout: Option<Duration>,
    medical_timeout: Option<Duration>,
    max_retries: Option<u32>,
    retry_backoff: Option<Duration>,
    retry_jitter: Option<Duration>,
    use_llm_router: Option<bool>,
    sql_default_limit: Option<u32>,
    sql_max_limit: Option<u32>,
    cohort_default_limit: Option<u32>,
    history_window: Option<usize>,
    handoff_mode: Option<HandoffMode>,
    prompt_dir: Option<PathBuf>,
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    env_string(key)
        .map(|raw| {
            raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.clone(),
            })
        })
        .transpose()
}

fn env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    env_string(key)
        .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.clone(),
            }),
        })
        .transpose()
}

fn env_secs(key: &str) -> Result<Option<Duration>, ConfigError> {
    Ok(env_parse::<u64>(key)?.map(Duration::from_secs))
}

fn env_millis(key: &str) -> Result<Option<Duration>, ConfigError> {
    Ok(env_parse::<u64>(key)?.map(Duration::from_millis))
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a variable that is set but
    /// does not parse.
    pub fn from_env(mut self) -> Result<Self, ConfigError> {
        if self.provider.is_none() {
            self.provider = env_string("BIOLINK_PROVIDER");
        }
        if self.api_key.is_none() {
            self.api_key = env_string("OPENAI_API_KEY").or_else(|| env_string("BIOLINK_API_KEY"));
        }
        if self.base_url.is_none() {
            self.base_url =
                env_string("OPENAI_BASE_URL").or_else(|| env_string("BIOLINK_BASE_URL"));
        }
        if self.router_model.is_none() {
            self.router_model = env_string("BIOLINK_ROUTER_MODEL");
        }
        if self.data_model.is_none() {
            self.data_model = env_string("BIOLINK_DATA_MODEL");
        }
        if self.medical_model.is_none() {
            self.medical_model = env_string("BIOLINK_MEDICAL_MODEL");
        }
        if self.router_timeout.is_none() {
            self.router_timeout = env_secs("BIOLINK_ROUTER_TIMEOUT_SECS")?;
        }
        if self.data_timeout.is_none() {
            self.data_timeout = env_secs("BIOLINK_DATA_TIMEOUT_SECS")?;
        }
        if self.medical_timeout.is_none() {
            self.medical_timeout = env_secs("BIOLINK_MEDICAL_TIMEOUT_SECS")?;
        }
        if self.max_retries.is_none() {
            self.max_retries = env_parse("BIOLINK_LLM_MAX_RETRIES")?;
        }
        if self.retry_backoff.is_none() {
            self.retry_backoff = env_millis("BIOLINK_LLM_RETRY_BACKOFF_MS")?;
        }
        if self.retry_jitter.is_none() {
            self.retry_jitter = env_millis("BIOLINK_LLM_RETRY_JITTER_MS")?;
        }
        if self.use_llm_router.is_none() {
            self.use_llm_router = env_bool("BIOLINK_USE_LLM_ROUTER")?;
        }
        if self.sql_default_limit.is_none() {
            self.sql_default_limit = env_parse("BIOLINK_SQL_DEFAULT_LIMIT")?;
        }
        if self.sql_max_limit.is_none() {
            self.sql_max_limit = env_parse("BIOLINK_SQL_MAX_LIMIT")?;
        }
        if self.history_window.is_none() {
            self.history_window = env_parse("BIOLINK_HISTORY_WINDOW")?;
        }
        if self.handoff_mode.is_none() {
            self.handoff_mode = env_parse("BIOLINK_HANDOFF_MODE")?;
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = env_string("BIOLINK_PROMPT_DIR").map(PathBuf::from);
        }
        Ok(self)
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the router model.
    #[must_use]
    pub fn router_model(mut self, model: impl Into<String>) -> Self {
        self.router_model = Some(model.into());
        self
    }

    /// Sets the data-agent model.
    #[must_use]
    pub fn data_model(mut self, model: impl Into<String>) -> Self {
        self.data_model = Some(model.into());
        self
    }

    /// Sets the medical-agent model.
    #[must_use]
    pub fn medical_model(mut self, model: impl Into<String>) -> Self {
        self.medical_model = Some(model.into());
        self
    }

    /// Sets the router timeout.
    #[must_use]
    pub const fn router_timeout(mut self, duration: Duration) -> Self {
        self.router_timeout = Some(duration);
        self
    }

    /// Sets the data-agent timeout.
    #[must_use]
    pub const fn data_timeout(mut self, duration: Duration) -> Self {
        self.data_timeout = Some(duration);
        self
    }

    /// Sets the medical-agent timeout.
    #[must_use]
    pub const fn medical_timeout(mut self, duration: Duration) -> Self {
        self.medical_timeout = Some(duration);
        self
    }

    /// Sets the max retries.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Sets the base retry backoff.
    #[must_use]
    pub const fn retry_backoff(mut self, delay: Duration) -> Self {
        self.retry_backoff = Some(delay);
        self
    }

    /// Sets the retry jitter bound.
    #[must_use]
    pub const fn retry_jitter(mut self, delay: Duration) -> Self {
        self.retry_jitter = Some(delay);
        self
    }

    /// Enables or disables the LLM router.
    #[must_use]
    pub const fn use_llm_router(mut self, enabled: bool) -> Self {
        self.use_llm_router = Some(enabled);
        self
    }

    /// Sets the default SQL row limit.
    #[must_use]
    pub const fn sql_default_limit(mut self, n: u32) -> Self {
        self.sql_default_limit = Some(n);
        self
    }

    /// Sets the maximum SQL row limit.
    #[must_use]
    pub const fn sql_max_limit(mut self, n: u32) -> Self {
        self.sql_max_limit = Some(n);
        self
    }

    /// Sets the default cohort size.
    #[must_use]
    pub const fn cohort_default_limit(mut self, n: u32) -> Self {
        self.cohort_default_limit = Some(n);
        self
    }

    /// Sets the number of history messages included in prompts.
    #[must_use]
    pub const fn history_window(mut self, n: usize) -> Self {
        self.history_window = Some(n);
        self
    }

    /// Sets the handoff mode.
    #[must_use]
    pub const fn handoff_mode(mut self, mode: HandoffMode) -> Self {
        self.handoff_mode = Some(mode);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `sql_max_limit` is zero or
    /// smaller than `sql_default_limit`.
    pub fn build(self) -> Result<AgentConfig, ConfigError> {
        let limits = RegistryLimits::default();
        let sql_max_limit = self.sql_max_limit.unwrap_or(limits.max_limit);
        let sql_default_limit = self.sql_default_limit.unwrap_or(limits.default_limit);
        if sql_max_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "sql_max_limit".to_string(),
                value: sql_max_limit.to_string(),
            });
        }
        if sql_default_limit > sql_max_limit {
            return Err(ConfigError::InvalidValue {
                key: "sql_default_limit".to_string(),
                value: format!("{sql_default_limit} (exceeds sql_max_limit {sql_max_limit})"),
            });
        }

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key: self.api_key,
            base_url: self.base_url,
            router_model: self
                .router_model
                .unwrap_or_else(|| DEFAULT_GENERAL_MODEL.to_string()),
            data_model: self
                .data_model
                .unwrap_or_else(|| DEFAULT_GENERAL_MODEL.to_string()),
            medical_model: self
                .medical_model
                .unwrap_or_else(|| DEFAULT_MEDICAL_MODEL.to_string()),
            router_timeout: self
                .router_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_ROUTER_TIMEOUT_SECS)),
            data_timeout: self
                .data_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_DATA_TIMEOUT_SECS)),
            medical_timeout: self
                .medical_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_MEDICAL_TIMEOUT_SECS)),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            retry_backoff: self
                .retry_backoff
                .unwrap_or(Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS)),
            retry_jitter: self
                .retry_jitter
                .unwrap_or(Duration::from_millis(DEFAULT_RETRY_JITTER_MS)),
            use_llm_router: self.use_llm_router.unwrap_or(true),
            sql_default_limit,
            sql_max_limit,
            cohort_default_limit: self
                .cohort_default_limit
                .unwrap_or(limits.cohort_default_limit)
                .min(sql_max_limit),
            history_window: self.history_window.unwrap_or(DEFAULT_HISTORY_WINDOW),
            handoff_mode: self.handoff_mode.unwrap_or_default(),
            prompt_dir: self.prompt_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = AgentConfig::builder()
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "openai");
        assert!(config.api_key.is_none());
        assert!(!config.has_backend());
        assert_eq!(config.router_model, "llama3.1:8b");
        assert_eq!(config.medical_model, "meditron:7b");
        assert_eq!(config.router_timeout, Duration::from_secs(10));
        assert_eq!(config.data_timeout, Duration::from_secs(20));
        assert_eq!(config.medical_timeout, Duration::from_secs(60));
        assert_eq!(config.sql_default_limit, 200);
        assert_eq!(config.sql_max_limit, 500);
        assert_eq!(config.history_window, 6);
        assert_eq!(config.handoff_mode, HandoffMode::Structured);
        assert!(config.use_llm_router);
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AgentConfig::builder()
            .api_key("key")
            .provider("custom")
            .medical_model("medllama")
            .max_retries(5)
            .medical_timeout(Duration::from_secs(90))
            .handoff_mode(HandoffMode::Combined)
            .use_llm_router(false)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "custom");
        assert_eq!(config.medical_model, "medllama");
        assert_eq!(config.medical_timeout, Duration::from_secs(90));
        assert_eq!(config.handoff_mode, HandoffMode::Combined);
        assert!(!config.use_llm_router);
        assert!(config.has_backend());
        assert_eq!(config.retry_policy().max_retries, 5);
    }

    #[test]
    fn test_base_url_alone_is_a_backend() {
        let config = AgentConfig::builder()
            .base_url("http://localhost:11434/v1")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert!(config.has_backend());
    }

    #[test]
    fn test_limits_are_validated() {
        let err = AgentConfig::builder()
            .sql_default_limit(600)
            .sql_max_limit(500)
            .build();
        assert!(matches!(
            err,
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "sql_default_limit"
        ));

        let err = AgentConfig::builder().sql_max_limit(0).build();
        assert!(err.is_err());
    }

    #[test]
    fn test_registry_limits_follow_config() {
        let config = AgentConfig::builder()
            .sql_default_limit(20)
            .sql_max_limit(50)
            .build()
            .unwrap_or_else(|_| unreachable!());
        let limits = config.registry_limits();
        assert_eq!(limits.default_limit, 20);
        assert_eq!(limits.max_limit, 50);
        assert_eq!(limits.cohort_default_limit, 50);
    }

    #[test]
    fn test_handoff_mode_parse() {
        assert_eq!("Combined".parse::<HandoffMode>().ok(), Some(HandoffMode::Combined));
        assert_eq!(" structured ".parse::<HandoffMode>().ok(), Some(HandoffMode::Structured));
        assert!("both".parse::<HandoffMode>().is_err());
    }
}
