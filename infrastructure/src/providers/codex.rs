//! Process-backed provider for the codex CLI.

use crate::normalize::normalize_codex_line;
use crate::providers::process::{CommandSpec, run_agent};
use async_trait::async_trait;
use council_application::{AgentProvider, ExecutionContext, ProviderError};
use council_domain::{AgentConfig, AgentResult, ProviderKind};
use std::path::PathBuf;

const CLI: &str = "codex";

pub struct CodexProvider;

impl CodexProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CodexProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the CLI invocation for one agent run.
///
/// `--sandbox read-only` is the backend's native non-destructive mode;
/// images go in as `-i` flags.
fn build_command(config: &AgentConfig, prompt: &str, images: &[PathBuf]) -> CommandSpec {
    let mut spec = CommandSpec::new(CLI)
        .args(["exec", "--json"])
        .args(["--sandbox", "read-only"])
        .arg("--skip-git-repo-check")
        .args(["-m", &config.model]);
    for image in images {
        spec = spec.arg("-i").arg(image.display().to_string());
    }
    spec.arg(prompt)
}

#[async_trait]
impl AgentProvider for CodexProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Codex
    }

    async fn discover_models(&self) -> Result<Vec<String>, ProviderError> {
        if which::which(CLI).is_err() {
            return Err(ProviderError::Unavailable(format!("{CLI} CLI not found")));
        }
        Ok(vec![
            "gpt-5.2-codex".to_string(),
            "gpt-5.1-codex".to_string(),
            "gpt-5.1-codex-mini".to_string(),
        ])
    }

    async fn execute(
        &self,
        config: &AgentConfig,
        prompt: &str,
        ctx: ExecutionContext,
    ) -> AgentResult {
        let spec = build_command(config, prompt, &ctx.images);
        run_agent(spec, config, &ctx, normalize_codex_line).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_read_only() {
        let config = AgentConfig::new(ProviderKind::Codex, "Codex", "gpt-5.2-codex");
        let spec = build_command(&config, "analyze", &[]);
        let args = spec.args.join(" ");
        assert!(args.contains("--sandbox read-only"));
        assert!(args.starts_with("exec --json"));
    }

    #[test]
    fn images_become_flags_before_the_prompt() {
        let config = AgentConfig::new(ProviderKind::Codex, "Codex", "gpt-5.2-codex");
        let spec = build_command(&config, "task", &[PathBuf::from("/tmp/shot.png")]);
        let args = spec.args.join(" ");
        assert!(args.contains("-i /tmp/shot.png"));
        assert_eq!(spec.args.last().unwrap(), "task");
    }
}
