//! Normalizer for `codex exec --json` JSONL output.
//!
//! Each line is one envelope `{"id":...,"msg":{"type":...}}`. The
//! `token_count` message is a running total for the whole run, so its
//! usage is tagged cumulative.

use crate::normalize::normalize_plain_line;
use council_domain::{ParsedEvent, TokenUsage, truncate_str};
use serde_json::Value;

/// Normalize one line of codex CLI output.
pub fn normalize_codex_line(line: &str) -> Vec<ParsedEvent> {
    let Ok(value) = serde_json::from_str::<Value>(line) else {
        return normalize_plain_line(line);
    };

    let Some(msg) = value.get("msg") else {
        return vec![ParsedEvent::raw(line)];
    };

    match msg.get("type").and_then(|t| t.as_str()) {
        Some("agent_message") => {
            let text = msg
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or_default();
            if text.is_empty() {
                Vec::new()
            } else {
                vec![ParsedEvent::text(text, line)]
            }
        }
        Some("agent_reasoning") => msg
            .get("text")
            .and_then(|t| t.as_str())
            .filter(|t| !t.is_empty())
            .map(|t| vec![ParsedEvent::thinking(t, line)])
            .unwrap_or_default(),
        Some("exec_command_begin") => {
            let command = msg
                .get("command")
                .and_then(|c| c.as_array())
                .map(|parts| {
                    parts
                        .iter()
                        .filter_map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default();
            vec![ParsedEvent::tool_call(
                format!("$ {}", truncate_str(&command, 160)),
                line,
            )]
        }
        Some("mcp_tool_call_begin") => {
            let tool = msg
                .get("invocation")
                .and_then(|i| i.get("tool"))
                .and_then(|t| t.as_str())
                .unwrap_or("mcp tool");
            vec![ParsedEvent::tool_call(tool, line)]
        }
        Some("token_count") => extract_token_count(msg)
            .map(|usage| vec![ParsedEvent::status("", line).with_usage(usage, true)])
            .unwrap_or_default(),
        Some("task_started") => vec![ParsedEvent::status("codex task started", line)],
        Some("task_complete") => vec![ParsedEvent::status("codex task complete", line)],
        Some("error") => {
            let message = msg
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            vec![ParsedEvent::status(format!("error: {message}"), line)]
        }
        _ => vec![ParsedEvent::raw(line)],
    }
}

/// The counter has appeared both flat and nested under `info.total_token_usage`.
fn extract_token_count(msg: &Value) -> Option<TokenUsage> {
    let counts = msg
        .get("info")
        .and_then(|i| i.get("total_token_usage"))
        .or_else(|| {
            if msg.get("input_tokens").is_some() {
                Some(msg)
            } else {
                None
            }
        })?;
    Some(TokenUsage::new(
        counts.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
        counts.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_domain::EventKind;

    #[test]
    fn agent_message_becomes_text() {
        let line = r#"{"id":"0","msg":{"type":"agent_message","message":"final answer"}}"#;
        let events = normalize_codex_line(line);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Text);
        assert_eq!(events[0].text, "final answer");
    }

    #[test]
    fn reasoning_becomes_thinking() {
        let line = r#"{"id":"0","msg":{"type":"agent_reasoning","text":"considering options"}}"#;
        let events = normalize_codex_line(line);
        assert_eq!(events[0].kind, EventKind::Thinking);
    }

    #[test]
    fn exec_command_becomes_tool_call() {
        let line = r#"{"id":"0","msg":{"type":"exec_command_begin","command":["rg","-n","main"]}}"#;
        let events = normalize_codex_line(line);
        assert_eq!(events[0].kind, EventKind::ToolCall);
        assert_eq!(events[0].text, "$ rg -n main");
    }

    #[test]
    fn token_count_is_cumulative_flat_shape() {
        let line = r#"{"id":"0","msg":{"type":"token_count","input_tokens":500,"output_tokens":120}}"#;
        let events = normalize_codex_line(line);
        assert_eq!(events.len(), 1);
        assert!(events[0].usage_is_cumulative);
        let usage = events[0].token_usage.as_ref().unwrap();
        assert_eq!(usage.input_tokens, 500);
        assert_eq!(usage.output_tokens, 120);
        assert_eq!(usage.total_cost, None);
    }

    #[test]
    fn token_count_is_cumulative_nested_shape() {
        let line = r#"{"id":"0","msg":{"type":"token_count","info":{"total_token_usage":{"input_tokens":900,"output_tokens":40}}}}"#;
        let events = normalize_codex_line(line);
        let usage = events[0].token_usage.as_ref().unwrap();
        assert_eq!(usage.input_tokens, 900);
        assert!(events[0].usage_is_cumulative);
    }

    #[test]
    fn unknown_msg_type_degrades_to_raw() {
        let line = r#"{"id":"0","msg":{"type":"something_new","payload":1}}"#;
        let events = normalize_codex_line(line);
        assert_eq!(events[0].kind, EventKind::Raw);
    }

    #[test]
    fn malformed_line_degrades_to_raw() {
        let events = normalize_codex_line("{not json");
        assert_eq!(events[0].kind, EventKind::Raw);
        assert_eq!(events[0].raw_line, "{not json");
    }

    #[test]
    fn non_json_status_chatter_becomes_status() {
        let events = normalize_codex_line("Waiting for auth...");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Status);
    }

    #[test]
    fn normalization_is_deterministic() {
        let line = r#"{"id":"0","msg":{"type":"agent_message","message":"x"}}"#;
        assert_eq!(normalize_codex_line(line), normalize_codex_line(line));
    }
}
