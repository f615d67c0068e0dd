//! Process-backed provider for the claude CLI.

use crate::normalize::normalize_claude_line;
use crate::providers::attach_images;
use crate::providers::process::{CommandSpec, run_agent};
use async_trait::async_trait;
use council_application::{AgentProvider, ExecutionContext, ProviderError};
use council_domain::{AgentConfig, AgentResult, ProviderKind};

const CLI: &str = "claude";

/// Tools the agent must never be given. Read-only exploration only.
const DISALLOWED_TOOLS: &str = "Write,Edit,NotebookEdit,Bash";

pub struct ClaudeProvider;

impl ClaudeProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClaudeProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the CLI invocation for one agent run.
///
/// `--permission-mode plan` plus the disallowed tool list keeps the run
/// non-destructive; this constraint is part of the provider contract, not
/// a tunable.
fn build_command(config: &AgentConfig, prompt: &str) -> CommandSpec {
    CommandSpec::new(CLI)
        .arg("-p")
        .arg(prompt)
        .args(["--output-format", "stream-json", "--verbose"])
        .args(["--model", &config.model])
        .args(["--permission-mode", "plan"])
        .args(["--disallowedTools", DISALLOWED_TOOLS])
}

#[async_trait]
impl AgentProvider for ClaudeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    async fn discover_models(&self) -> Result<Vec<String>, ProviderError> {
        if which::which(CLI).is_err() {
            return Err(ProviderError::Unavailable(format!("{CLI} CLI not found")));
        }
        Ok(vec![
            "claude-opus-4.5".to_string(),
            "claude-sonnet-4.5".to_string(),
            "claude-haiku-4.5".to_string(),
        ])
    }

    async fn execute(
        &self,
        config: &AgentConfig,
        prompt: &str,
        ctx: ExecutionContext,
    ) -> AgentResult {
        let prompt = attach_images(prompt, &ctx.images);
        let spec = build_command(config, &prompt);
        run_agent(spec, config, &ctx, normalize_claude_line).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_read_only() {
        let config = AgentConfig::new(ProviderKind::Claude, "Claude", "claude-sonnet-4.5");
        let spec = build_command(&config, "analyze this repo");
        assert_eq!(spec.program, "claude");
        let args = spec.args.join(" ");
        assert!(args.contains("--permission-mode plan"));
        assert!(args.contains("--disallowedTools Write,Edit,NotebookEdit,Bash"));
    }

    #[test]
    fn command_streams_json_for_the_configured_model() {
        let config = AgentConfig::new(ProviderKind::Claude, "Claude", "claude-opus-4.5");
        let spec = build_command(&config, "task");
        let args = spec.args.join(" ");
        assert!(args.contains("--output-format stream-json"));
        assert!(args.contains("--model claude-opus-4.5"));
        assert!(spec.args.contains(&"task".to_string()));
    }
}
