//! Error types for biolink-rs.
//!
//! Each concern has its own error enum; [`Error`] unifies them for the
//! crate's public fallible APIs. Validation errors ([`ToolError`],
//! [`SqlPolicyError`]) are the only kind that is expected to surface above the
//! orchestrator: model failures are handled by agent fallbacks and storage
//! failures become data inside a tool result.

use std::time::Duration;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Model backend failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Tool registry validation failure.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Relational store failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl Error {
    /// Returns `true` for caller mistakes (unknown tool, unsafe SQL, bad
    /// arguments) that map to a 4xx-equivalent response.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Tool(_))
    }
}

/// Failure modes of a single model call.
///
/// Agents match on these to choose their degraded-mode fallback.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// The attempt did not complete within its time box.
    #[error("model call timed out after {}s", .timeout.as_secs_f64())]
    Timeout {
        /// The per-attempt timeout that was exceeded.
        timeout: Duration,
    },

    /// The backend rejected or failed the request.
    #[error("model API request failed: {message}")]
    ApiRequest {
        /// Error detail from the backend or transport.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// The model answered but the answer could not be interpreted.
    #[error("failed to parse model response: {message}")]
    ResponseParse {
        /// What went wrong.
        message: String,
        /// The raw response content.
        content: String,
    },

    /// No API key was configured for a backend that needs one.
    #[error("no API key configured (set OPENAI_API_KEY or BIOLINK_API_KEY, or a local BIOLINK_BASE_URL)")]
    ApiKeyMissing,

    /// The configured provider name has no implementation.
    #[error("unsupported model provider: {name}")]
    UnsupportedProvider {
        /// The provider name that was requested.
        name: String,
    },
}

/// Reasons the SQL sanitizer refuses a statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqlPolicyError {
    /// The statement is empty or whitespace.
    #[error("SQL must not be empty")]
    Empty,

    /// The statement contains `;`.
    #[error("multiple SQL statements are not allowed")]
    MultipleStatements,

    /// The statement contains `--`, `/*` or `*/`.
    #[error("SQL comments are not allowed")]
    Comment,

    /// The statement does not start with `SELECT` or `WITH`.
    #[error("only SELECT queries are allowed")]
    NotReadOnly,

    /// A DDL/DML keyword appears in the statement.
    #[error("unsafe SQL detected: {keyword}")]
    ForbiddenKeyword {
        /// The offending keyword.
        keyword: String,
    },

    /// The statement reads from a table outside the allow-list.
    #[error("query references disallowed table: {table}")]
    DisallowedTable {
        /// The first disallowed table name found.
        table: String,
    },
}

/// Validation errors raised by the tool registry. Never retried.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// The tool name is not in the catalogue.
    #[error("unknown tool: {name}")]
    UnknownTool {
        /// The requested tool name.
        name: String,
    },

    /// Free-form SQL failed sanitization.
    #[error(transparent)]
    UnsafeSql(#[from] SqlPolicyError),

    /// The arguments could not be decoded for the tool.
    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments {
        /// Tool name.
        tool: String,
        /// Decoding error detail.
        message: String,
    },
}

/// Relational store failures.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying SQLite call failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The connection mutex was poisoned by a panicking holder.
    #[error("database connection lock poisoned")]
    LockPoisoned,

    /// The blocking worker running the query did not complete.
    #[error("database worker failed: {message}")]
    Worker {
        /// Join error detail.
        message: String,
    },
}

/// Configuration values that could not be interpreted.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A value was present but malformed.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Setting name or environment variable.
        key: String,
        /// The rejected value.
        value: String,
    },
}

/// Failures of the command-line harness.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The registry database has not been created yet.
    #[error("registry not initialized at {path} (run `biolink-rs init`)")]
    NotInitialized {
        /// Database path that was checked.
        path: String,
    },

    /// A command could not complete.
    #[error("{0}")]
    ExecutionFailed(String),
}
