//! Normalizer for the claude CLI's streaming JSON output.
//!
//! The CLI emits two schema variants depending on version and invocation
//! mode: the legacy shape (`{"type":"assistant","message":{...}}`) and the
//! SDK event-stream shape (`{"type":"stream_event","event":{...}}`). Both
//! are folded into one internal event space ([`ClaudeEvent`]) before being
//! mapped to canonical events, so downstream dispatch never branches on
//! which variant produced a line.
//!
//! Text duplication: the backend streams intermediate assistant text and
//! then repeats the complete answer on the terminal `result` event. Only
//! the `result` text becomes a `text` event; intermediate text blocks are
//! suppressed, while their thinking/tool siblings are still emitted.

use crate::normalize::normalize_plain_line;
use council_domain::{ParsedEvent, TokenUsage, truncate_str};
use serde_json::Value;

/// Internal event space both schema variants are folded into.
#[derive(Debug, Clone, PartialEq)]
enum ClaudeEvent {
    Init { model: String },
    /// Intermediate assistant text. Superseded by the `result` event.
    AssistantText,
    Thinking(String),
    ToolUse { name: String, input: String },
    Result { text: String, usage: Option<TokenUsage> },
    Unknown,
}

/// Normalize one line of claude CLI output.
pub fn normalize_claude_line(line: &str) -> Vec<ParsedEvent> {
    let Ok(value) = serde_json::from_str::<Value>(line) else {
        return normalize_plain_line(line);
    };

    classify(&value)
        .into_iter()
        .filter_map(|event| render(event, line))
        .collect()
}

fn render(event: ClaudeEvent, line: &str) -> Option<ParsedEvent> {
    match event {
        ClaudeEvent::Init { model } => {
            Some(ParsedEvent::status(format!("claude session started ({model})"), line))
        }
        ClaudeEvent::AssistantText => None,
        ClaudeEvent::Thinking(text) => Some(ParsedEvent::thinking(text, line)),
        ClaudeEvent::ToolUse { name, input } => {
            let summary = if input.is_empty() {
                name
            } else {
                format!("{name} {}", truncate_str(&input, 120))
            };
            Some(ParsedEvent::tool_call(summary, line))
        }
        ClaudeEvent::Result { text, usage } => {
            let mut event = ParsedEvent::text(text, line);
            if let Some(usage) = usage {
                // The result usage is the authoritative run total.
                event = event.with_usage(usage, true);
            }
            Some(event)
        }
        ClaudeEvent::Unknown => Some(ParsedEvent::raw(line)),
    }
}

/// Fold either schema variant into [`ClaudeEvent`]s.
fn classify(value: &Value) -> Vec<ClaudeEvent> {
    match value.get("type").and_then(|t| t.as_str()) {
        Some("system") => {
            let model = value
                .get("model")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown model")
                .to_string();
            vec![ClaudeEvent::Init { model }]
        }
        Some("assistant") => value
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_array())
            .map(|blocks| blocks.iter().filter_map(classify_content_block).collect())
            .unwrap_or_default(),
        Some("result") => {
            let text = value
                .get("result")
                .and_then(|r| r.as_str())
                .unwrap_or_default()
                .to_string();
            vec![ClaudeEvent::Result {
                text,
                usage: extract_result_usage(value),
            }]
        }
        Some("stream_event") => value
            .get("event")
            .map(classify_stream_event)
            .unwrap_or_default(),
        // tool results echoed back as "user" turns carry nothing to render
        Some("user") => Vec::new(),
        _ => vec![ClaudeEvent::Unknown],
    }
}

fn classify_content_block(block: &Value) -> Option<ClaudeEvent> {
    match block.get("type").and_then(|t| t.as_str())? {
        "text" => Some(ClaudeEvent::AssistantText),
        "thinking" => block
            .get("thinking")
            .and_then(|t| t.as_str())
            .map(|t| ClaudeEvent::Thinking(t.to_string())),
        "tool_use" => Some(ClaudeEvent::ToolUse {
            name: block
                .get("name")
                .and_then(|n| n.as_str())
                .unwrap_or("tool")
                .to_string(),
            input: block
                .get("input")
                .map(|i| i.to_string())
                .unwrap_or_default(),
        }),
        _ => None,
    }
}

/// SDK event-stream shape: the envelope wraps Anthropic streaming events.
fn classify_stream_event(event: &Value) -> Vec<ClaudeEvent> {
    match event.get("type").and_then(|t| t.as_str()) {
        Some("content_block_start") => event
            .get("content_block")
            .and_then(classify_content_block)
            .into_iter()
            .collect(),
        Some("content_block_delta") => {
            match event
                .get("delta")
                .and_then(|d| d.get("type"))
                .and_then(|t| t.as_str())
            {
                Some("text_delta") => vec![ClaudeEvent::AssistantText],
                Some("thinking_delta") => event
                    .get("delta")
                    .and_then(|d| d.get("thinking"))
                    .and_then(|t| t.as_str())
                    .map(|t| ClaudeEvent::Thinking(t.to_string()))
                    .into_iter()
                    .collect(),
                _ => Vec::new(),
            }
        }
        // message_start/message_delta/message_stop carry no renderable content;
        // usage is taken from the terminal "result" event only.
        _ => Vec::new(),
    }
}

fn extract_result_usage(value: &Value) -> Option<TokenUsage> {
    let usage = value.get("usage")?;
    let mut total = TokenUsage::new(
        usage.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
        usage.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
    );
    if let Some(cost) = value.get("total_cost_usd").and_then(|v| v.as_f64()) {
        total = total.with_cost(cost);
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_domain::EventKind;

    #[test]
    fn intermediate_assistant_text_is_suppressed() {
        let line = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"partial answer"}]}}"#;
        assert!(normalize_claude_line(line).is_empty());
    }

    #[test]
    fn tool_use_sibling_survives_text_suppression() {
        let line = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"looking"},{"type":"tool_use","name":"Read","input":{"file_path":"src/main.rs"}}]}}"#;
        let events = normalize_claude_line(line);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::ToolCall);
        assert!(events[0].text.starts_with("Read"));
    }

    #[test]
    fn thinking_block_becomes_thinking_event() {
        let line = r#"{"type":"assistant","message":{"content":[{"type":"thinking","thinking":"let me check"}]}}"#;
        let events = normalize_claude_line(line);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Thinking);
        assert_eq!(events[0].text, "let me check");
    }

    #[test]
    fn result_becomes_text_with_cumulative_usage() {
        let line = r#"{"type":"result","subtype":"success","result":"the full plan","usage":{"input_tokens":1200,"output_tokens":340},"total_cost_usd":0.0123}"#;
        let events = normalize_claude_line(line);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Text);
        assert_eq!(events[0].text, "the full plan");
        assert!(events[0].usage_is_cumulative);
        let usage = events[0].token_usage.as_ref().unwrap();
        assert_eq!(usage.input_tokens, 1200);
        assert_eq!(usage.output_tokens, 340);
        assert_eq!(usage.total_cost, Some(0.0123));
    }

    #[test]
    fn stream_event_text_delta_is_suppressed() {
        let line = r#"{"type":"stream_event","event":{"type":"content_block_delta","delta":{"type":"text_delta","text":"chunk"}}}"#;
        assert!(normalize_claude_line(line).is_empty());
    }

    #[test]
    fn stream_event_tool_use_maps_like_legacy_shape() {
        let line = r#"{"type":"stream_event","event":{"type":"content_block_start","content_block":{"type":"tool_use","name":"Grep","input":{"pattern":"fn main"}}}}"#;
        let events = normalize_claude_line(line);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::ToolCall);
        assert!(events[0].text.starts_with("Grep"));
    }

    #[test]
    fn system_init_becomes_status() {
        let line = r#"{"type":"system","subtype":"init","model":"claude-sonnet-4.5"}"#;
        let events = normalize_claude_line(line);
        assert_eq!(events[0].kind, EventKind::Status);
        assert!(events[0].text.contains("claude-sonnet-4.5"));
    }

    #[test]
    fn non_json_line_degrades_to_raw() {
        let events = normalize_claude_line("plain output");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Raw);
        assert_eq!(events[0].text, "plain output");
    }

    #[test]
    fn blank_non_json_line_emits_nothing() {
        assert!(normalize_claude_line("   ").is_empty());
    }

    #[test]
    fn non_json_status_chatter_becomes_status() {
        let events = normalize_claude_line("Data collection is enabled.");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Status);
    }

    #[test]
    fn normalization_is_deterministic() {
        let line = r#"{"type":"result","result":"plan","usage":{"input_tokens":1,"output_tokens":2}}"#;
        assert_eq!(normalize_claude_line(line), normalize_claude_line(line));
    }
}
