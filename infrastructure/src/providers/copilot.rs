//! Session-backed provider for the copilot CLI.
//!
//! No subprocess per agent: every execution opens one conversation on the
//! shared transport and consumes its event stream until `session.idle`,
//! an inactivity timeout, or cancellation. The handle registered with the
//! run controller is the zero-pid token handle; stopping means unwinding
//! the consuming loop, not signalling a process.

use crate::copilot::error::CopilotError;
use crate::copilot::protocol::{CreateSessionParams, JsonRpcRequest, SendParams};
use crate::copilot::transport::{SessionEvents, extract_delta_text, shared_transport};
use crate::normalize::normalize_copilot_event;
use crate::providers::attach_images;
use async_trait::async_trait;
use council_application::{
    AgentProvider, ExecutionContext, ProviderError, TokenStopHandle,
};
use council_domain::{
    AgentConfig, AgentResult, AgentStatus, ParsedEvent, PromptTemplate, ProviderKind,
    UsageAccumulator,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const CLI: &str = "copilot";

/// No event for this long means the session is done talking.
const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(120);

/// Creation parameters for a competitor session.
///
/// The read-only invariant is enforced here, at the point the invocation
/// is constructed: the session declares an explicit empty tool surface,
/// and the system prompt restates the analysis-only instruction on top.
fn session_params(config: &AgentConfig) -> CreateSessionParams {
    CreateSessionParams {
        model: Some(config.model.clone()),
        system_prompt: Some(PromptTemplate::competitor_preamble().to_string()),
        tools: Some(Vec::new()),
    }
}

/// Drain a session's event stream until it goes idle, stalls past
/// `inactivity`, errors, or is cancelled. The accumulated delta text
/// becomes a single authoritative `text` event at the end, so downstream
/// never renders the same content twice.
async fn consume_session_events<S: SessionEvents>(
    key: &str,
    events: &mut S,
    token: &CancellationToken,
    ctx: &ExecutionContext,
    result: &mut AgentResult,
    usage: &mut UsageAccumulator,
    inactivity: Duration,
) -> Result<(), CopilotError> {
    let mut full_text = String::new();
    let mut turn_delta_bytes: usize = 0;

    loop {
        let routed = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(CopilotError::Cancelled),
            received = tokio::time::timeout(inactivity, events.next_event()) => {
                match received {
                    Ok(Ok(routed)) => routed,
                    Ok(Err(e)) => return Err(e),
                    Err(_) => {
                        warn!(agent = %key, "no session event for {:?}, treating as finished", inactivity);
                        break;
                    }
                }
            }
        };

        match routed.event_type.as_str() {
            "assistant.message.delta" => {
                if let Some(content) = extract_delta_text(&routed.event) {
                    full_text.push_str(content);
                    turn_delta_bytes += content.len();
                }
            }
            "assistant.message" | "assistant.message.completed" => {
                // Completed content stands in only when no deltas
                // arrived for this turn.
                if turn_delta_bytes == 0
                    && let Some(content) = extract_delta_text(&routed.event)
                {
                    full_text.push_str(content);
                }
            }
            "assistant.turn_start" => {
                turn_delta_bytes = 0;
            }
            "session.idle" => {
                debug!(agent = %key, bytes = full_text.len(), "session idle");
                break;
            }
            "session.error" => {
                let message = routed
                    .event
                    .get("data")
                    .and_then(|d| d.get("message"))
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown session error");
                return Err(CopilotError::Rpc {
                    code: -1,
                    message: message.to_string(),
                });
            }
            _ => {
                for event in normalize_copilot_event(&routed.event_type, &routed.event) {
                    if let Some(report) = &event.token_usage {
                        usage.apply(report, event.usage_is_cumulative);
                    }
                    ctx.progress.on_agent_event(key, &event);
                    result.events.push(event);
                }
            }
        }
    }

    if !full_text.is_empty() {
        let event = ParsedEvent::text(full_text, "assistant.message");
        ctx.progress.on_agent_event(key, &event);
        result.events.push(event);
    }
    Ok(())
}

pub struct CopilotProvider;

impl CopilotProvider {
    pub fn new() -> Self {
        Self
    }

    /// Open one conversation on the shared transport and drive it to
    /// completion, pushing normalized events into `result` as they arrive.
    async fn run_session(
        &self,
        config: &AgentConfig,
        prompt: &str,
        ctx: &ExecutionContext,
        token: &CancellationToken,
        result: &mut AgentResult,
        usage: &mut UsageAccumulator,
    ) -> Result<(), CopilotError> {
        let key = config.agent_key();
        let transport = shared_transport().await?;

        let mut channel = transport.create_session(session_params(config)).await?;

        let send = SendParams {
            session_id: channel.session_id().to_string(),
            prompt: prompt.to_string(),
        };
        let request = JsonRpcRequest::new("session.send", Some(serde_json::to_value(&send)?));
        let response = transport.request(&request).await?;
        if let Some(error) = response.error {
            return Err(CopilotError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        consume_session_events(
            &key,
            &mut channel,
            token,
            ctx,
            result,
            usage,
            INACTIVITY_TIMEOUT,
        )
        .await
    }
}

impl Default for CopilotProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentProvider for CopilotProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Copilot
    }

    async fn discover_models(&self) -> Result<Vec<String>, ProviderError> {
        if which::which(CLI).is_err() {
            return Err(ProviderError::Unavailable(format!("{CLI} CLI not found")));
        }
        // The CLI has no model-listing endpoint; this is the known set.
        Ok(vec![
            "claude-sonnet-4.5".to_string(),
            "claude-opus-4.5".to_string(),
            "gpt-5.2".to_string(),
            "gpt-5.1".to_string(),
            "gemini-3-pro".to_string(),
        ])
    }

    async fn execute(
        &self,
        config: &AgentConfig,
        prompt: &str,
        ctx: ExecutionContext,
    ) -> AgentResult {
        let mut result = AgentResult::queued(config);
        let key = config.agent_key();
        let token = ctx.cancel.clone();
        ctx.controller
            .register(&key, Arc::new(TokenStopHandle::new(token.clone())));

        result.mark_running();
        ctx.progress.on_agent_status(&key, AgentStatus::Running);

        let prompt = attach_images(prompt, &ctx.images);
        let mut usage = UsageAccumulator::new();
        let settled = self
            .run_session(config, &prompt, &ctx, &token, &mut result, &mut usage)
            .await;

        ctx.controller.unregister(&key);
        result.usage = usage.into_total();

        let status = if ctx.controller.is_cancelled() {
            AgentStatus::Cancelled
        } else if token.is_cancelled() {
            AgentStatus::Aborted
        } else {
            match settled {
                Ok(()) => AgentStatus::Success,
                Err(e) => {
                    warn!(agent = %key, "session failed: {}", e);
                    result.push_error(e.to_string());
                    AgentStatus::Error
                }
            }
        };
        result.finish(status);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copilot::transport::testing::ScriptedSession;
    use council_application::{NoProgress, RunController};
    use council_domain::EventKind;

    fn config() -> AgentConfig {
        AgentConfig::new(ProviderKind::Copilot, "Copilot", "gpt-5.2")
    }

    fn context() -> ExecutionContext {
        ExecutionContext::new(Arc::new(RunController::new()), Arc::new(NoProgress))
    }

    #[test]
    fn session_declares_no_tools_and_the_readonly_preamble() {
        let params = session_params(&config());
        assert_eq!(params.tools, Some(Vec::new()));
        let prompt = params.system_prompt.unwrap();
        assert!(prompt.contains("read-only"));
        assert_eq!(params.model.as_deref(), Some("gpt-5.2"));
    }

    #[tokio::test]
    async fn stalled_stream_settles_with_accumulated_text() {
        let mut events = ScriptedSession::new(vec![
            ScriptedSession::delta("first "),
            ScriptedSession::delta("half"),
        ]);
        let token = CancellationToken::new();
        let ctx = context();
        let mut result = AgentResult::queued(&config());
        let mut usage = UsageAccumulator::new();

        let settled = consume_session_events(
            "copilot",
            &mut events,
            &token,
            &ctx,
            &mut result,
            &mut usage,
            Duration::from_millis(20),
        )
        .await;

        assert!(settled.is_ok());
        let text = result
            .events
            .iter()
            .find(|e| e.kind == EventKind::Text)
            .expect("accumulated text event");
        assert_eq!(text.text, "first half");
    }

    #[tokio::test]
    async fn idle_ends_the_session_before_any_timeout() {
        let mut events = ScriptedSession::new(vec![
            ScriptedSession::delta("answer"),
            ScriptedSession::idle(),
        ]);
        let token = CancellationToken::new();
        let ctx = context();
        let mut result = AgentResult::queued(&config());
        let mut usage = UsageAccumulator::new();

        let settled = consume_session_events(
            "copilot",
            &mut events,
            &token,
            &ctx,
            &mut result,
            &mut usage,
            Duration::from_secs(60),
        )
        .await;

        assert!(settled.is_ok());
        assert_eq!(result.events.last().unwrap().text, "answer");
    }

    #[tokio::test]
    async fn completed_message_stands_in_only_without_deltas() {
        let mut events = ScriptedSession::new(vec![
            ScriptedSession::delta("streamed"),
            ScriptedSession::completed("streamed again"),
            ScriptedSession::idle(),
        ]);
        let token = CancellationToken::new();
        let ctx = context();
        let mut result = AgentResult::queued(&config());
        let mut usage = UsageAccumulator::new();

        consume_session_events(
            "copilot",
            &mut events,
            &token,
            &ctx,
            &mut result,
            &mut usage,
            Duration::from_secs(60),
        )
        .await
        .unwrap();

        // The completed echo never duplicates already-streamed content
        assert_eq!(result.events.last().unwrap().text, "streamed");
    }

    #[tokio::test]
    async fn cancel_mid_stream_unwinds_with_cancelled() {
        let mut events = ScriptedSession::new(vec![ScriptedSession::delta("partial")]);
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            canceller.cancel();
        });
        let ctx = context();
        let mut result = AgentResult::queued(&config());
        let mut usage = UsageAccumulator::new();

        let settled = consume_session_events(
            "copilot",
            &mut events,
            &token,
            &ctx,
            &mut result,
            &mut usage,
            Duration::from_secs(60),
        )
        .await;

        assert!(matches!(settled, Err(CopilotError::Cancelled)));
    }
}
