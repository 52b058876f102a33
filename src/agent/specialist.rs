//! The closed set of specialist agents and their dispatch table.

use super::canned::{GeneralAgent, UiAgent};
use super::cohort::CohortAgent;
use super::data::DataAgent;
use super::medical::MedicalAgent;
use super::rag::RagAgent;
use super::traits::{AgentName, AgentResult, Turn};
use crate::core::Intent;
use crate::error::ToolError;
use crate::registry::ToolRegistry;

/// One agent per intent.
#[derive(Debug, Clone)]
pub struct Specialists {
    /// SQL and charts.
    pub data: DataAgent,
    /// Clinical reasoning and handoff review.
    pub medical: MedicalAgent,
    /// Notes retrieval.
    pub rag: RagAgent,
    /// Cohort builder.
    pub cohort: CohortAgent,
    /// Navigation guidance.
    pub ui: UiAgent,
    /// Fallback guidance.
    pub general: GeneralAgent,
}

impl Specialists {
    /// Looks up the specialist for `intent`.
    #[must_use]
    pub const fn select(&self, intent: Intent) -> Specialist<'_> {
        match intent {
            Intent::Data => Specialist::Data(&self.data),
            Intent::Medical => Specialist::Medical(&self.medical),
            Intent::Rag => Specialist::Rag(&self.rag),
            Intent::Cohort => Specialist::Cohort(self.cohort),
            Intent::Ui => Specialist::Ui(self.ui),
            Intent::General => Specialist::General(self.general),
        }
    }
}

/// A selected specialist, ready to run.
#[derive(Debug, Clone, Copy)]
pub enum Specialist<'a> {
    /// Data agent.
    Data(&'a DataAgent),
    /// Medical agent.
    Medical(&'a MedicalAgent),
    /// Retrieval agent.
    Rag(&'a RagAgent),
    /// Cohort agent.
    Cohort(CohortAgent),
    /// UI agent.
    Ui(UiAgent),
    /// Fallback agent.
    General(GeneralAgent),
}

impl Specialist<'_> {
    /// Name of the agent.
    #[must_use]
    pub const fn name(&self) -> AgentName {
        match self {
            Self::Data(_) => AgentName::Data,
            Self::Medical(_) => AgentName::Medical,
            Self::Rag(_) => AgentName::Rag,
            Self::Cohort(_) => AgentName::Cohort,
            Self::Ui(_) => AgentName::Ui,
            Self::General(_) => AgentName::General,
        }
    }

    /// Runs the agent for one turn.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] only for validation failures at the registry
    /// boundary. Model and execution failures are absorbed by each agent's
    /// fallback.
    pub async fn run(self, turn: Turn<'_>, tools: &ToolRegistry) -> Result<AgentResult, ToolError> {
        match self {
            Self::Data(agent) => agent.run(turn, tools).await,
            Self::Medical(agent) => Ok(agent.run(turn).await),
            Self::Rag(agent) => Ok(agent.run(turn).await),
            Self::Cohort(agent) => Ok(agent.run(turn, tools).await),
            Self::Ui(agent) => Ok(agent.run()),
            Self::General(agent) => Ok(agent.run()),
        }
    }
}
