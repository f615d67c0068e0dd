//! Canonical event model shared by every backend.
//!
//! Each provider's normalizer turns raw streaming output, whatever its
//! native schema, into a sequence of [`ParsedEvent`]s classified by
//! [`EventKind`]. Consumers (the orchestrator, loggers, renderers) only ever
//! see this taxonomy.

use crate::usage::TokenUsage;
use serde::{Deserialize, Serialize};

/// The five-way classification every backend is normalized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Assistant answer text (authoritative, goes into the plan).
    Text,
    /// Model reasoning / chain-of-thought output.
    Thinking,
    /// The agent invoked a tool (command, file read, …).
    ToolCall,
    /// Backend lifecycle or side-channel notice (init, share link, …).
    Status,
    /// Unclassified output, kept verbatim for diagnostics and plan fallback.
    Raw,
}

/// One normalized event from an agent's stream.
///
/// `token_usage` may ride on any event. When `usage_is_cumulative` is true
/// the attached usage is the authoritative running total for the agent and
/// replaces everything accumulated so far; otherwise it is a delta to be
/// summed (see [`UsageAccumulator`](crate::usage::UsageAccumulator)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedEvent {
    pub kind: EventKind,
    /// Display text for this event (empty for pure usage carriers).
    pub text: String,
    /// The raw line or payload this event was normalized from.
    pub raw_line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    #[serde(default)]
    pub usage_is_cumulative: bool,
}

impl ParsedEvent {
    pub fn new(kind: EventKind, text: impl Into<String>, raw_line: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            raw_line: raw_line.into(),
            token_usage: None,
            usage_is_cumulative: false,
        }
    }

    pub fn text(text: impl Into<String>, raw_line: impl Into<String>) -> Self {
        Self::new(EventKind::Text, text, raw_line)
    }

    pub fn thinking(text: impl Into<String>, raw_line: impl Into<String>) -> Self {
        Self::new(EventKind::Thinking, text, raw_line)
    }

    pub fn tool_call(text: impl Into<String>, raw_line: impl Into<String>) -> Self {
        Self::new(EventKind::ToolCall, text, raw_line)
    }

    pub fn status(text: impl Into<String>, raw_line: impl Into<String>) -> Self {
        Self::new(EventKind::Status, text, raw_line)
    }

    pub fn raw(line: impl Into<String>) -> Self {
        let line = line.into();
        Self::new(EventKind::Raw, line.clone(), line)
    }

    /// Attach a token-usage report to this event.
    pub fn with_usage(mut self, usage: TokenUsage, cumulative: bool) -> Self {
        self.token_usage = Some(usage);
        self.usage_is_cumulative = cumulative;
        self
    }

    /// Returns true if this event contributes to the normalized plan.
    pub fn is_plan_text(&self) -> bool {
        self.kind == EventKind::Text && !self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_kind() {
        assert_eq!(ParsedEvent::text("a", "l").kind, EventKind::Text);
        assert_eq!(ParsedEvent::thinking("a", "l").kind, EventKind::Thinking);
        assert_eq!(ParsedEvent::tool_call("a", "l").kind, EventKind::ToolCall);
        assert_eq!(ParsedEvent::status("a", "l").kind, EventKind::Status);
        assert_eq!(ParsedEvent::raw("l").kind, EventKind::Raw);
    }

    #[test]
    fn raw_mirrors_line_into_text() {
        let event = ParsedEvent::raw("some output");
        assert_eq!(event.text, "some output");
        assert_eq!(event.raw_line, "some output");
    }

    #[test]
    fn with_usage_marks_cumulative() {
        let usage = TokenUsage::new(10, 20);
        let event = ParsedEvent::status("done", "{}").with_usage(usage.clone(), true);
        assert_eq!(event.token_usage, Some(usage));
        assert!(event.usage_is_cumulative);
    }

    #[test]
    fn plan_text_requires_text_kind_and_content() {
        assert!(ParsedEvent::text("plan", "l").is_plan_text());
        assert!(!ParsedEvent::text("", "l").is_plan_text());
        assert!(!ParsedEvent::raw("plan").is_plan_text());
    }

    #[test]
    fn serde_round_trip() {
        let event = ParsedEvent::text("hello", "{\"t\":1}")
            .with_usage(TokenUsage::new(1, 2), false);
        let json = serde_json::to_string(&event).unwrap();
        let back: ParsedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
