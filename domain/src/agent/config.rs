//! Agent configuration (Value Object)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The closed set of supported backend kinds.
///
/// Each kind has its own provider implementation and its own normalizer;
/// adding a backend means adding one variant and one provider, not
/// branching pervasively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Process-backed: `claude` CLI streaming JSON (two schema variants).
    Claude,
    /// Process-backed: `codex` CLI JSONL.
    Codex,
    /// Process-backed: `gemini` CLI plain-text output.
    Gemini,
    /// Session-backed: shared copilot CLI transport.
    Copilot,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude",
            ProviderKind::Codex => "codex",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Copilot => "copilot",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude" => Ok(ProviderKind::Claude),
            "codex" => Ok(ProviderKind::Codex),
            "gemini" => Ok(ProviderKind::Gemini),
            "copilot" => Ok(ProviderKind::Copilot),
            other => Err(format!("unknown provider kind: {other}")),
        }
    }
}

/// Configuration for one agent instance in a run.
///
/// The same provider kind may appear more than once (e.g. two claude agents
/// with different models); `instance_id` disambiguates them. The identity
/// used everywhere downstream is [`AgentConfig::agent_key`], which must be
/// unique within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Which backend runs this agent.
    pub id: ProviderKind,
    /// Unique instance id when a kind participates more than once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// Human-readable name shown in reports.
    pub name: String,
    /// Model id passed to the backend.
    pub model: String,
    /// Working directory the agent explores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
    /// Disabled agents are skipped at dispatch.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl AgentConfig {
    pub fn new(id: ProviderKind, name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id,
            instance_id: None,
            name: name.into(),
            model: model.into(),
            working_directory: None,
            enabled: true,
        }
    }

    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Identity of this agent within a run: `instance_id` when set,
    /// otherwise the provider kind.
    pub fn agent_key(&self) -> String {
        self.instance_id
            .clone()
            .unwrap_or_else(|| self.id.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_key_prefers_instance_id() {
        let config = AgentConfig::new(ProviderKind::Claude, "Claude", "claude-sonnet-4.5")
            .with_instance_id("claude-2");
        assert_eq!(config.agent_key(), "claude-2");
    }

    #[test]
    fn agent_key_falls_back_to_kind() {
        let config = AgentConfig::new(ProviderKind::Codex, "Codex", "gpt-5.2-codex");
        assert_eq!(config.agent_key(), "codex");
    }

    #[test]
    fn provider_kind_round_trip() {
        for kind in [
            ProviderKind::Claude,
            ProviderKind::Codex,
            ProviderKind::Gemini,
            ProviderKind::Copilot,
        ] {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
        assert!("cursor".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn enabled_defaults_to_true_in_serde() {
        let config: AgentConfig = serde_json::from_str(
            r#"{"id":"gemini","name":"Gemini","model":"gemini-3-pro"}"#,
        )
        .unwrap();
        assert!(config.enabled);
    }
}
