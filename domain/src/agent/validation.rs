//! Agent configuration validation.
//!
//! Problems are reported as typed issues rather than errors so callers can
//! decide what is fatal (duplicate keys are; a disabled agent is not).

use crate::agent::config::AgentConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigIssueCode {
    DuplicateAgentKey,
    NoEnabledAgents,
    EmptyModel,
}

/// One problem found in a run's agent configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigIssue {
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    fn new(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Validate the agent set for one run.
///
/// Checks the identity invariant (`agent_key` unique within a run), that at
/// least one agent is enabled, and that every enabled agent names a model.
pub fn validate_agents(agents: &[AgentConfig]) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    for agent in agents {
        let key = agent.agent_key();
        if !seen.insert(key.clone()) {
            issues.push(ConfigIssue::new(
                ConfigIssueCode::DuplicateAgentKey,
                format!("agent key '{key}' appears more than once"),
            ));
        }
        if agent.enabled && agent.model.trim().is_empty() {
            issues.push(ConfigIssue::new(
                ConfigIssueCode::EmptyModel,
                format!("agent '{key}' has no model configured"),
            ));
        }
    }

    if !agents.iter().any(|a| a.enabled) {
        issues.push(ConfigIssue::new(
            ConfigIssueCode::NoEnabledAgents,
            "no enabled agents configured",
        ));
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::config::ProviderKind;

    #[test]
    fn valid_set_has_no_issues() {
        let agents = vec![
            AgentConfig::new(ProviderKind::Claude, "Claude", "claude-sonnet-4.5"),
            AgentConfig::new(ProviderKind::Codex, "Codex", "gpt-5.2-codex"),
        ];
        assert!(validate_agents(&agents).is_empty());
    }

    #[test]
    fn duplicate_keys_detected() {
        let agents = vec![
            AgentConfig::new(ProviderKind::Claude, "A", "m"),
            AgentConfig::new(ProviderKind::Claude, "B", "m"),
        ];
        let issues = validate_agents(&agents);
        assert!(issues.iter().any(|i| i.code == ConfigIssueCode::DuplicateAgentKey));
    }

    #[test]
    fn instance_ids_resolve_duplicates() {
        let agents = vec![
            AgentConfig::new(ProviderKind::Claude, "A", "m").with_instance_id("claude-1"),
            AgentConfig::new(ProviderKind::Claude, "B", "m").with_instance_id("claude-2"),
        ];
        assert!(validate_agents(&agents).is_empty());
    }

    #[test]
    fn all_disabled_is_flagged() {
        let agents = vec![AgentConfig::new(ProviderKind::Gemini, "G", "m").disabled()];
        let issues = validate_agents(&agents);
        assert!(issues.iter().any(|i| i.code == ConfigIssueCode::NoEnabledAgents));
    }

    #[test]
    fn empty_model_flagged_for_enabled_only() {
        let agents = vec![
            AgentConfig::new(ProviderKind::Codex, "C", ""),
            AgentConfig::new(ProviderKind::Claude, "A", "m"),
        ];
        let issues = validate_agents(&agents);
        assert!(issues.iter().any(|i| i.code == ConfigIssueCode::EmptyModel));
    }
}
