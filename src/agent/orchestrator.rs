//! Orchestrator for one conversational turn.
//!
//! Runs the pipeline: classify → (optional) LLM re-route → dispatch to the
//! specialist → mandatory medical handoff. Stages run strictly in sequence;
//! the orchestrator holds no per-call state, so one instance can serve
//! concurrent turns.

use std::fmt;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info};

use super::canned::{GeneralAgent, UiAgent};
use super::cohort::CohortAgent;
use super::config::{AgentConfig, HandoffMode};
use super::data::DataAgent;
use super::medical::MedicalAgent;
use super::message::ChatMessage;
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::rag::{RagAgent, RetrievalService};
use super::router::LlmRouter;
use super::specialist::Specialists;
use super::traits::{AgentName, AgentResult, ModelBackend, Turn};
use crate::audit::{AuditEvent, AuditEventType, AuditSink, TracingAuditSink};
use crate::core::{Intent, IntentClassifier};
use crate::error::Result;
use crate::registry::ToolRegistry;

/// Characters of the message kept in the `intent_routed` audit record.
const AUDIT_MESSAGE_CHARS: usize = 200;

/// Coordinates classification, dispatch and handoff.
pub struct Orchestrator {
    config: AgentConfig,
    classifier: IntentClassifier,
    router: Option<LlmRouter>,
    specialists: Specialists,
    tools: ToolRegistry,
    audit: Arc<dyn AuditSink>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("router", &self.router.is_some())
            .field("handoff_mode", &self.config.handoff_mode)
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator, loading prompts from
    /// [`AgentConfig::prompt_dir`] with compiled-in fallbacks.
    ///
    /// Without a provider every model-backed agent runs in degraded mode
    /// and the LLM router is off.
    #[must_use]
    pub fn new(
        config: AgentConfig,
        provider: Option<Arc<dyn LlmProvider>>,
        tools: ToolRegistry,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self::with_prompts(config, provider, tools, &prompts)
    }

    /// Creates an orchestrator with explicit prompts.
    #[must_use]
    pub fn with_prompts(
        config: AgentConfig,
        provider: Option<Arc<dyn LlmProvider>>,
        tools: ToolRegistry,
        prompts: &PromptSet,
    ) -> Self {
        let backend = provider.map(|p| ModelBackend::new(p, config.retry_policy()));

        let router = if config.use_llm_router {
            backend.clone().map(|backend| {
                LlmRouter::new(
                    backend,
                    &config.router_model,
                    &prompts.router,
                    config.router_timeout,
                    config.history_window,
                )
            })
        } else {
            None
        };

        let specialists = Specialists {
            data: DataAgent::new(
                backend.clone(),
                &config.data_model,
                &prompts.data,
                config.data_timeout,
                config.history_window,
            ),
            medical: MedicalAgent::new(
                backend,
                &config.medical_model,
                &prompts.medical,
                &prompts.handoff,
                config.medical_timeout,
                config.history_window,
            ),
            rag: RagAgent::unavailable(),
            cohort: CohortAgent,
            ui: UiAgent,
            general: GeneralAgent,
        };

        Self {
            config,
            classifier: IntentClassifier::new(),
            router,
            specialists,
            tools,
            audit: Arc::new(TracingAuditSink),
        }
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    /// Connects the notes retrieval service used by the RAG agent.
    #[must_use]
    pub fn with_retrieval(mut self, service: Arc<dyn RetrievalService>) -> Self {
        self.specialists.rag = RagAgent::new(
            Some(service),
            self.config.retry_policy(),
            self.config.data_timeout,
        );
        self
    }

    /// The tool registry.
    #[must_use]
    pub const fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answers one user turn.
    ///
    /// Every specialist other than the medical agent has its result
    /// reviewed by the medical agent; the returned result then has
    /// `agent == medical` and `metadata.handoff_from` naming the specialist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tool`](crate::error::Error::Tool) when user-typed
    /// SQL is rejected by the registry. Nothing else is caught here.
    pub async fn orchestrate(
        &self,
        message: &str,
        history: &[ChatMessage],
        request_id: &str,
    ) -> Result<AgentResult> {
        let turn = Turn::new(message, history);

        let heuristic = self.classifier.classify(message);
        let intent = self.reclassify(turn, heuristic).await;
        debug!(request_id, %heuristic, %intent, "intent routed");
        self.emit(
            AuditEventType::IntentRouted,
            request_id,
            json!({
                "intent": intent,
                "heuristic_intent": heuristic,
                "message": message.chars().take(AUDIT_MESSAGE_CHARS).collect::<String>(),
            }),
        );

        let specialist = self.specialists.select(intent);
        let agent = specialist.name();
        self.emit(
            AuditEventType::AgentSelected,
            request_id,
            json!({ "agent": agent }),
        );

        let result = specialist.run(turn, &self.tools).await?;
        self.emit(
            AuditEventType::AgentCompleted,
            request_id,
            json!({ "agent": agent, "tool_calls": result.tool_names() }),
        );

        if result.agent == AgentName::Medical {
            return Ok(result);
        }

        self.emit(
            AuditEventType::AgentHandoff,
            request_id,
            json!({ "from": agent, "to": AgentName::Medical }),
        );
        let medical = &self.specialists.medical;
        let reviewed = match self.config.handoff_mode {
            HandoffMode::Structured => medical.run_handoff(turn, result).await,
            HandoffMode::Combined => medical.run_combined(turn, result).await,
        };
        info!(request_id, from = %agent, mode = %self.config.handoff_mode, "turn completed");
        Ok(reviewed)
    }

    /// Consults the LLM router for `general` classifications. Router
    /// failures and unknown labels keep the heuristic intent.
    async fn reclassify(&self, turn: Turn<'_>, heuristic: Intent) -> Intent {
        if heuristic != Intent::General || turn.message.trim().is_empty() {
            return heuristic;
        }
        match &self.router {
            Some(router) => router.route(turn).await.unwrap_or(heuristic),
            None => heuristic,
        }
    }

    fn emit(&self, event_type: AuditEventType, request_id: &str, payload: Value) {
        self.audit
            .emit(AuditEvent::new(event_type, request_id, payload));
    }
}
