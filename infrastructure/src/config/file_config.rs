//! Configuration file structure.
//!
//! ```toml
//! [[agents]]
//! provider = "claude"
//! model = "claude-sonnet-4.5"
//!
//! [[agents]]
//! provider = "codex"
//! model = "gpt-5.2-codex"
//! instance_id = "codex-fast"
//!
//! [judges]
//! models = ["claude-opus-4.5", "gpt-5.2"]
//!
//! [chairman]
//! model = "claude-opus-4.5"
//!
//! [run]
//! record_path = "runs/council.jsonl"
//! ```

use council_domain::{AgentConfig, ProviderKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub agents: Vec<FileAgentConfig>,
    #[serde(default)]
    pub judges: JudgesConfig,
    #[serde(default)]
    pub chairman: ChairmanConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl FileConfig {
    /// Convert the agent entries to domain configs.
    ///
    /// Fails on an unknown provider kind; duplicate-key and empty-list
    /// validation happens downstream via
    /// [`validate_agents`](council_domain::validate_agents).
    pub fn agent_configs(&self) -> Result<Vec<AgentConfig>, String> {
        self.agents.iter().map(FileAgentConfig::to_agent_config).collect()
    }
}

/// One `[[agents]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAgentConfig {
    /// Backend kind: "claude", "codex", "gemini", or "copilot".
    pub provider: String,
    /// Unique id when the same kind participates more than once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// Display name; defaults to the provider kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl FileAgentConfig {
    pub fn to_agent_config(&self) -> Result<AgentConfig, String> {
        let kind: ProviderKind = self.provider.parse()?;
        let name = self.name.clone().unwrap_or_else(|| kind.as_str().to_string());
        let mut config = AgentConfig::new(kind, name, self.model.clone());
        if let Some(instance_id) = &self.instance_id {
            config = config.with_instance_id(instance_id.clone());
        }
        if let Some(dir) = &self.working_directory {
            config = config.with_working_directory(dir.clone());
        }
        if !self.enabled {
            config = config.disabled();
        }
        Ok(config)
    }
}

/// The `[judges]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JudgesConfig {
    #[serde(default)]
    pub models: Vec<String>,
}

/// The `[chairman]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChairmanConfig {
    #[serde(default = "default_chairman_model")]
    pub model: String,
}

fn default_chairman_model() -> String {
    "claude-opus-4.5".to_string()
}

impl Default for ChairmanConfig {
    fn default() -> Self {
        Self {
            model: default_chairman_model(),
        }
    }
}

/// The `[run]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Where to append JSONL run records. Absent means no persistence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_path: Option<PathBuf>,
    /// Judge chunk flush interval override, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_flush_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_empty_but_well_formed() {
        let config = FileConfig::default();
        assert!(config.agents.is_empty());
        assert!(config.judges.models.is_empty());
        assert_eq!(config.chairman.model, "claude-opus-4.5");
        assert!(config.run.record_path.is_none());
    }

    #[test]
    fn parses_full_toml() {
        let toml = r#"
            [[agents]]
            provider = "claude"
            model = "claude-sonnet-4.5"

            [[agents]]
            provider = "codex"
            model = "gpt-5.2-codex"
            instance_id = "codex-fast"
            enabled = false

            [judges]
            models = ["claude-opus-4.5", "gpt-5.2"]

            [chairman]
            model = "gpt-5.2"

            [run]
            record_path = "runs/council.jsonl"
        "#;
        let config: FileConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.agents.len(), 2);
        assert_eq!(config.judges.models.len(), 2);
        assert_eq!(config.chairman.model, "gpt-5.2");

        let agents = config.agent_configs().unwrap();
        assert_eq!(agents[0].id, ProviderKind::Claude);
        assert_eq!(agents[0].name, "claude");
        assert!(agents[0].enabled);
        assert_eq!(agents[1].agent_key(), "codex-fast");
        assert!(!agents[1].enabled);
    }

    #[test]
    fn unknown_provider_kind_is_an_error() {
        let entry = FileAgentConfig {
            provider: "cursor".to_string(),
            instance_id: None,
            name: None,
            model: "m".to_string(),
            working_directory: None,
            enabled: true,
        };
        let err = entry.to_agent_config().unwrap_err();
        assert!(err.contains("cursor"));
    }
}
