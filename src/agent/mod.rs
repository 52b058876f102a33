//! Conversational agents for the patient registry.
//!
//! A turn flows through the [`Orchestrator`]: the keyword classifier picks
//! an intent (with an optional LLM re-route for `general`), the matching
//! specialist runs, and every non-medical result is reviewed by the
//! medical agent before it is returned.
//!
//! # Architecture
//!
//! ```text
//! message + history → Orchestrator
//!   ├── IntentClassifier (keywords) ──general?──► LlmRouter
//!   ├── Specialists::select(intent)
//!   │   ├── DataAgent    ── plan / heuristics ──► ToolRegistry
//!   │   ├── CohortAgent  ── filters ───────────► ToolRegistry
//!   │   ├── MedicalAgent, RagAgent, UiAgent, GeneralAgent
//!   └── MedicalAgent::run_handoff (unless the specialist was medical)
//! ```
//!
//! Every model call goes through [`retry::invoke_with_retries`].

pub mod canned;
pub mod client;
pub mod cohort;
pub mod config;
pub mod data;
pub mod medical;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod rag;
pub mod retry;
pub mod router;
pub mod specialist;
pub mod tool;
pub mod traits;

// Re-export key types
pub use client::create_provider;
pub use config::{AgentConfig, HandoffMode};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use orchestrator::Orchestrator;
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use rag::RetrievalService;
pub use retry::{RetryPolicy, invoke_with_retries};
pub use tool::{ToolCall, ToolDefinition};
pub use traits::{Agent, AgentName, AgentResult, ModelBackend, Turn};
