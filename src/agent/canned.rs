//! Stateless guidance agents. Neither calls tools or models.

use super::traits::{AgentName, AgentResult};

const UI_GUIDANCE: &str = "I can navigate you to the requested view. Try: open registry, open analytics, or open cohort builder.";
const GENERAL_GUIDANCE: &str = "I can help with registry questions, cohorts, or notes. Ask about counts, cohorts, or clinical notes.";

/// Navigation guidance.
#[derive(Debug, Clone, Copy, Default)]
pub struct UiAgent;

impl UiAgent {
    /// Returns the navigation hint.
    #[must_use]
    pub fn run(self) -> AgentResult {
        AgentResult::new(AgentName::Ui, UI_GUIDANCE)
    }
}

/// Fallback guidance for anything unclassified.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneralAgent;

impl GeneralAgent {
    /// Returns the capability summary.
    #[must_use]
    pub fn run(self) -> AgentResult {
        AgentResult::new(AgentName::General, GENERAL_GUIDANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canned_agents() {
        let ui = UiAgent.run();
        assert_eq!(ui.agent, AgentName::Ui);
        assert!(ui.content.contains("open cohort builder"));
        assert!(ui.tool_calls.is_empty());

        let general = GeneralAgent.run();
        assert_eq!(general.agent, AgentName::General);
        assert!(general.metadata.is_empty());
    }
}
