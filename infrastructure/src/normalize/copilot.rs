//! Normalizer for copilot session events.
//!
//! The session-backed provider receives routed `session.event` payloads
//! rather than output lines; this maps each `(event_type, event)` pair to
//! canonical events. Text deltas map to nothing here: the provider's read
//! loop accumulates them and pushes one authoritative `text` event when
//! the session goes idle, so the same content is never rendered twice.
//!
//! Usage reports from this backend are per-step deltas and are tagged
//! non-cumulative.

use council_domain::{ParsedEvent, TokenUsage};
use serde_json::Value;

/// Normalize one routed copilot session event.
pub fn normalize_copilot_event(event_type: &str, event: &Value) -> Vec<ParsedEvent> {
    let raw = event.to_string();
    match event_type {
        // Accumulated by the provider loop; see module docs.
        "assistant.message.delta" | "assistant.message" | "assistant.message.completed" => {
            Vec::new()
        }
        "assistant.reasoning" => event
            .get("data")
            .and_then(|d| d.get("content"))
            .and_then(|c| c.as_str())
            .filter(|t| !t.is_empty())
            .map(|t| vec![ParsedEvent::thinking(t, &raw)])
            .unwrap_or_default(),
        "tool.execution_start" => {
            let tool = event
                .get("data")
                .and_then(|d| d.get("toolName").or_else(|| d.get("name")))
                .and_then(|v| v.as_str())
                .unwrap_or("tool");
            vec![ParsedEvent::tool_call(tool, &raw)]
        }
        "assistant.usage" | "session.usage_info" => extract_usage(event)
            .map(|usage| vec![ParsedEvent::status("", &raw).with_usage(usage, false)])
            .unwrap_or_default(),
        "session.idle" => vec![ParsedEvent::status("session idle", &raw)],
        "session.error" => {
            let message = event
                .get("data")
                .and_then(|d| d.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("unknown session error");
            vec![ParsedEvent::status(format!("error: {message}"), &raw)]
        }
        // turn boundaries and pending-message bookkeeping carry nothing
        "assistant.turn_start" | "assistant.turn_end" | "pending_messages.modified"
        | "user.message" => Vec::new(),
        _ => vec![ParsedEvent::raw(raw)],
    }
}

fn extract_usage(event: &Value) -> Option<TokenUsage> {
    let data = event.get("data")?;
    let counts = data.get("usage").unwrap_or(data);
    let input = counts
        .get("inputTokens")
        .or_else(|| counts.get("input_tokens"))
        .and_then(|v| v.as_u64());
    let output = counts
        .get("outputTokens")
        .or_else(|| counts.get("output_tokens"))
        .and_then(|v| v.as_u64());
    if input.is_none() && output.is_none() {
        return None;
    }
    Some(TokenUsage::new(input.unwrap_or(0), output.unwrap_or(0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_domain::EventKind;

    #[test]
    fn message_delta_emits_nothing() {
        let event = serde_json::json!({"data": {"content": "partial"}});
        assert!(normalize_copilot_event("assistant.message.delta", &event).is_empty());
    }

    #[test]
    fn reasoning_becomes_thinking() {
        let event = serde_json::json!({"data": {"content": "weighing approaches"}});
        let events = normalize_copilot_event("assistant.reasoning", &event);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Thinking);
        assert_eq!(events[0].text, "weighing approaches");
    }

    #[test]
    fn tool_execution_becomes_tool_call() {
        let event = serde_json::json!({"data": {"toolName": "str_replace_editor"}});
        let events = normalize_copilot_event("tool.execution_start", &event);
        assert_eq!(events[0].kind, EventKind::ToolCall);
        assert_eq!(events[0].text, "str_replace_editor");
    }

    #[test]
    fn usage_is_tagged_as_delta() {
        let event = serde_json::json!({"data": {"inputTokens": 50, "outputTokens": 20}});
        let events = normalize_copilot_event("assistant.usage", &event);
        assert_eq!(events.len(), 1);
        assert!(!events[0].usage_is_cumulative);
        let usage = events[0].token_usage.as_ref().unwrap();
        assert_eq!(usage.input_tokens, 50);
        assert_eq!(usage.output_tokens, 20);
    }

    #[test]
    fn nested_snake_case_usage_is_accepted() {
        let event = serde_json::json!({"data": {"usage": {"input_tokens": 7, "output_tokens": 3}}});
        let events = normalize_copilot_event("session.usage_info", &event);
        let usage = events[0].token_usage.as_ref().unwrap();
        assert_eq!(usage.input_tokens, 7);
    }

    #[test]
    fn usage_event_without_counts_emits_nothing() {
        let event = serde_json::json!({"data": {"note": "no counts"}});
        assert!(normalize_copilot_event("assistant.usage", &event).is_empty());
    }

    #[test]
    fn unknown_event_degrades_to_raw() {
        let event = serde_json::json!({"data": {}});
        let events = normalize_copilot_event("something.new", &event);
        assert_eq!(events[0].kind, EventKind::Raw);
    }

    #[test]
    fn normalization_is_deterministic() {
        let event = serde_json::json!({"data": {"content": "r"}});
        assert_eq!(
            normalize_copilot_event("assistant.reasoning", &event),
            normalize_copilot_event("assistant.reasoning", &event)
        );
    }
}
