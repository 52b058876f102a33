//! # BIOLINK-RS
//!
//! Conversational orchestration core for a clinical patient registry.
//!
//! A user message is classified into an intent, dispatched to one
//! specialist agent (data, medical, rag, cohort, ui or general), and the
//! specialist's result is always reviewed by the medical agent before it is
//! returned. Registry access goes through a fixed tool catalogue whose
//! free-form SQL path only accepts read-only, row-limited statements.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use biolink_rs::agent::{AgentConfig, Orchestrator};
//! use biolink_rs::registry::ToolRegistry;
//! use biolink_rs::storage::SqliteStore;
//!
//! # async fn run() -> biolink_rs::Result<()> {
//! let store = SqliteStore::in_memory()?;
//! store.init()?;
//! store.seed_sample()?;
//!
//! let config = AgentConfig::builder().use_llm_router(false).build()?;
//! let tools = ToolRegistry::with_limits(Arc::new(store), config.registry_limits());
//! let orchestrator = Orchestrator::new(config, None, tools);
//!
//! let result = orchestrator
//!     .orchestrate("How many patients are there?", &[], "req-1")
//!     .await?;
//! assert_eq!(result.agent.as_str(), "medical");
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod audit;
pub mod cli;
pub mod core;
pub mod error;
pub mod registry;
pub mod session;
pub mod storage;

pub use agent::{AgentConfig, AgentResult, Orchestrator};
pub use audit::{AuditEvent, AuditEventType, AuditSink};
pub use crate::core::{Intent, IntentClassifier};
pub use error::{Error, Result};
pub use registry::ToolRegistry;
pub use session::{ConversationStore, InMemoryConversationStore};
pub use storage::SqliteStore;
