//! Process-backed provider for the gemini CLI.
//!
//! This backend streams plain text rather than structured events, so its
//! runs usually settle with only `raw` events; the plan extractor's
//! trailing-raw-lines fallback recovers the answer.

use crate::normalize::normalize_gemini_line;
use crate::providers::attach_images;
use crate::providers::process::{CommandSpec, run_agent};
use async_trait::async_trait;
use council_application::{AgentProvider, ExecutionContext, ProviderError};
use council_domain::{AgentConfig, AgentResult, ProviderKind};

const CLI: &str = "gemini";

pub struct GeminiProvider;

impl GeminiProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GeminiProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the CLI invocation for one agent run.
///
/// `--sandbox` keeps any tool the model reaches for away from the real
/// filesystem; the read-only instruction also travels in the prompt
/// preamble.
fn build_command(config: &AgentConfig, prompt: &str) -> CommandSpec {
    CommandSpec::new(CLI)
        .arg("--sandbox")
        .args(["-m", &config.model])
        .args(["-p", prompt])
}

#[async_trait]
impl AgentProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn discover_models(&self) -> Result<Vec<String>, ProviderError> {
        if which::which(CLI).is_err() {
            return Err(ProviderError::Unavailable(format!("{CLI} CLI not found")));
        }
        Ok(vec![
            "gemini-3-pro".to_string(),
            "gemini-2.5-pro".to_string(),
            "gemini-2.5-flash".to_string(),
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
        run_agent(spec, config, &ctx, normalize_gemini_line).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_sandboxed() {
        let config = AgentConfig::new(ProviderKind::Gemini, "Gemini", "gemini-3-pro");
        let spec = build_command(&config, "analyze");
        assert_eq!(spec.program, "gemini");
        assert!(spec.args.contains(&"--sandbox".to_string()));
        let args = spec.args.join(" ");
        assert!(args.contains("-m gemini-3-pro"));
        assert!(args.contains("-p analyze"));
    }
}
