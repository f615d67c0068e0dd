//! Model gateway riding the shared copilot transport.
//!
//! Judges and the chairman are plain completions: one session per call,
//! prompt in, streamed text out. Reuses the same lazily-spawned server
//! process as the session-backed agent provider.

use crate::copilot::error::CopilotError;
use crate::copilot::protocol::{CreateSessionParams, JsonRpcRequest, SendParams};
use crate::copilot::transport::{SessionEvents, extract_delta_text, shared_transport};
use crate::normalize::normalize_copilot_event;
use async_trait::async_trait;
use council_application::{GatewayError, ModelGateway, ModelReply};
use council_domain::UsageAccumulator;
use std::time::Duration;
use tracing::{debug, warn};

/// No event for this long means the model is done talking.
const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(120);

/// Gateway for direct model completions through the copilot CLI.
#[derive(Default)]
pub struct CopilotModelGateway;

impl CopilotModelGateway {
    pub fn new() -> Self {
        Self
    }
}

/// Drain a completion session's events into the final reply, streaming
/// chunks through `on_chunk` as they arrive. Terminal conditions mirror
/// the agent session loop: idle, stall past `inactivity`, or error.
async fn consume_completion_events<S: SessionEvents>(
    model: &str,
    events: &mut S,
    on_chunk: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    inactivity: Duration,
) -> Result<ModelReply, GatewayError> {
    let mut text = String::new();
    let mut turn_delta_bytes: usize = 0;
    let mut usage = UsageAccumulator::new();

    loop {
        let routed = match tokio::time::timeout(inactivity, events.next_event()).await {
            Ok(Ok(routed)) => routed,
            Ok(Err(CopilotError::RouterStopped)) => {
                return Err(GatewayError::TransportClosed);
            }
            Ok(Err(e)) => return Err(GatewayError::RequestFailed(e.to_string())),
            Err(_) => {
                warn!(model, "no session event for {:?}, treating as finished", inactivity);
                break;
            }
        };

        match routed.event_type.as_str() {
            "assistant.message.delta" => {
                if let Some(content) = extract_delta_text(&routed.event) {
                    on_chunk(content);
                    text.push_str(content);
                    turn_delta_bytes += content.len();
                }
            }
            "assistant.message" | "assistant.message.completed" => {
                // Completed content stands in only when no deltas
                // arrived for this turn.
                if turn_delta_bytes == 0
                    && let Some(content) = extract_delta_text(&routed.event)
                {
                    on_chunk(content);
                    text.push_str(content);
                }
            }
            "assistant.turn_start" => {
                turn_delta_bytes = 0;
            }
            "session.idle" => {
                debug!(model, bytes = text.len(), "completion finished");
                break;
            }
            "session.error" => {
                let message = routed
                    .event
                    .get("data")
                    .and_then(|d| d.get("message"))
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown session error");
                return Err(GatewayError::RequestFailed(message.to_string()));
            }
            _ => {
                for event in normalize_copilot_event(&routed.event_type, &routed.event) {
                    if let Some(report) = &event.token_usage {
                        usage.apply(report, event.usage_is_cumulative);
                    }
                }
            }
        }
    }

    let usage = usage.into_total();
    Ok(ModelReply {
        text,
        usage: if usage.is_empty() { None } else { Some(usage) },
    })
}

#[async_trait]
impl ModelGateway for CopilotModelGateway {
    async fn complete_streaming(
        &self,
        model: &str,
        prompt: &str,
        on_chunk: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<ModelReply, GatewayError> {
        let transport = shared_transport()
            .await
            .map_err(|e| GatewayError::ConnectionError(e.to_string()))?;

        let params = CreateSessionParams {
            model: Some(model.to_string()),
            system_prompt: None,
            tools: Some(Vec::new()),
        };
        let mut channel = transport
            .create_session(params)
            .await
            .map_err(|e| GatewayError::SessionError(e.to_string()))?;

        let send = SendParams {
            session_id: channel.session_id().to_string(),
            prompt: prompt.to_string(),
        };
        let request = JsonRpcRequest::new(
            "session.send",
            Some(
                serde_json::to_value(&send)
                    .map_err(|e| GatewayError::RequestFailed(e.to_string()))?,
            ),
        );
        let response = transport
            .request(&request)
            .await
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;
        if let Some(error) = response.error {
            return Err(GatewayError::RequestFailed(error.message));
        }

        consume_completion_events(model, &mut channel, on_chunk, INACTIVITY_TIMEOUT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copilot::transport::testing::ScriptedSession;
    use std::sync::Mutex;

    #[tokio::test]
    async fn stalled_completion_settles_with_streamed_text() {
        let mut session = ScriptedSession::new(vec![
            ScriptedSession::delta("sorted "),
            ScriptedSession::delta("verdict"),
        ]);
        let chunks: Mutex<Vec<String>> = Mutex::new(Vec::new());
        let on_chunk = |chunk: &str| chunks.lock().unwrap().push(chunk.to_string());

        let reply = consume_completion_events(
            "gpt-5.2",
            &mut session,
            &on_chunk,
            Duration::from_millis(20),
        )
        .await
        .unwrap();

        assert_eq!(reply.text, "sorted verdict");
        assert_eq!(
            *chunks.lock().unwrap(),
            vec!["sorted ".to_string(), "verdict".to_string()]
        );
    }

    #[tokio::test]
    async fn idle_finishes_the_completion_before_any_timeout() {
        let mut session = ScriptedSession::new(vec![
            ScriptedSession::delta("done"),
            ScriptedSession::idle(),
        ]);

        let reply = consume_completion_events(
            "gpt-5.2",
            &mut session,
            &|_chunk| {},
            Duration::from_secs(60),
        )
        .await
        .unwrap();

        assert_eq!(reply.text, "done");
    }

    #[tokio::test]
    async fn completed_message_stands_in_only_without_deltas() {
        let mut session = ScriptedSession::new(vec![
            ScriptedSession::completed("whole answer"),
            ScriptedSession::idle(),
        ]);

        let reply = consume_completion_events(
            "gpt-5.2",
            &mut session,
            &|_chunk| {},
            Duration::from_secs(60),
        )
        .await
        .unwrap();

        assert_eq!(reply.text, "whole answer");
    }
}
