//! Agent execution results and plan extraction.

use crate::agent::config::{AgentConfig, ProviderKind};
use crate::event::{EventKind, ParsedEvent};
use crate::usage::TokenUsage;
use crate::util::looks_like_json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How many trailing raw output lines to mine for a plan when a backend
/// produced no `text` events at all.
const PLAN_FALLBACK_LINES: usize = 80;

/// Plan text used when nothing could be extracted. A `success` result never
/// carries an absent plan.
pub const PLAN_PLACEHOLDER: &str = "(no plan produced)";

/// Lifecycle status of one agent execution.
///
/// `queued → running → {success | error | aborted | cancelled}`.
/// A result is frozen once a terminal status is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Queued,
    Running,
    Success,
    Error,
    /// Killed via single-agent cancellation.
    Aborted,
    /// Run-wide cancellation was in effect.
    Cancelled,
}

impl AgentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AgentStatus::Queued | AgentStatus::Running)
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentStatus::Queued => "queued",
            AgentStatus::Running => "running",
            AgentStatus::Success => "success",
            AgentStatus::Error => "error",
            AgentStatus::Aborted => "aborted",
            AgentStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Complete record of one agent's execution within a run.
///
/// Created at dispatch with status `queued`, mutated only by its own
/// execution task, frozen at the first terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub id: ProviderKind,
    pub agent_key: String,
    pub name: String,
    pub model: String,
    pub status: AgentStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Final candidate text, extracted when the agent finishes.
    pub normalized_plan: String,
    pub errors: Vec<String>,
    pub events: Vec<ParsedEvent>,
    pub usage: TokenUsage,
}

impl AgentResult {
    /// Create the dispatch-time record for an agent.
    pub fn queued(config: &AgentConfig) -> Self {
        Self {
            id: config.id,
            agent_key: config.agent_key(),
            name: config.name.clone(),
            model: config.model.clone(),
            status: AgentStatus::Queued,
            started_at: Utc::now(),
            ended_at: None,
            normalized_plan: String::new(),
            errors: Vec::new(),
            events: Vec::new(),
            usage: TokenUsage::default(),
        }
    }

    pub fn mark_running(&mut self) {
        if !self.status.is_terminal() {
            self.status = AgentStatus::Running;
        }
    }

    /// Transition to a terminal status and extract the plan. Later calls on
    /// an already-terminal result are ignored.
    pub fn finish(&mut self, status: AgentStatus) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        self.ended_at = Some(Utc::now());
        self.normalized_plan = extract_normalized_plan(&self.events);
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn is_success(&self) -> bool {
        self.status == AgentStatus::Success
    }
}

/// Extract the final candidate text from an agent's event stream.
///
/// Preference order:
/// 1. every `text` event, concatenated in emission order;
/// 2. the last [`PLAN_FALLBACK_LINES`] non-JSON-looking raw lines (plain-text
///    backends produce their whole answer as `raw` events);
/// 3. [`PLAN_PLACEHOLDER`].
pub fn extract_normalized_plan(events: &[ParsedEvent]) -> String {
    let mut plan = String::new();
    for event in events.iter().filter(|e| e.is_plan_text()) {
        if !plan.is_empty() {
            plan.push('\n');
        }
        plan.push_str(&event.text);
    }
    if !plan.trim().is_empty() {
        return plan;
    }

    let raw_lines: Vec<&str> = events
        .iter()
        .filter(|e| e.kind == EventKind::Raw)
        .map(|e| e.raw_line.as_str())
        .filter(|line| !line.trim().is_empty() && !looks_like_json(line))
        .collect();
    let start = raw_lines.len().saturating_sub(PLAN_FALLBACK_LINES);
    let fallback = raw_lines[start..].join("\n");
    if !fallback.trim().is_empty() {
        return fallback;
    }

    PLAN_PLACEHOLDER.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::config::AgentConfig;

    fn config() -> AgentConfig {
        AgentConfig::new(ProviderKind::Claude, "Claude", "claude-sonnet-4.5")
    }

    #[test]
    fn queued_result_has_no_terminal_state() {
        let result = AgentResult::queued(&config());
        assert_eq!(result.status, AgentStatus::Queued);
        assert!(result.ended_at.is_none());
    }

    #[test]
    fn finish_freezes_status() {
        let mut result = AgentResult::queued(&config());
        result.mark_running();
        result.finish(AgentStatus::Success);
        result.finish(AgentStatus::Error);
        assert_eq!(result.status, AgentStatus::Success);
    }

    #[test]
    fn finish_extracts_plan_from_text_events() {
        let mut result = AgentResult::queued(&config());
        result.events.push(ParsedEvent::text("step one", "l1"));
        result.events.push(ParsedEvent::thinking("hmm", "l2"));
        result.events.push(ParsedEvent::text("step two", "l3"));
        result.finish(AgentStatus::Success);
        assert_eq!(result.normalized_plan, "step one\nstep two");
    }

    #[test]
    fn plan_falls_back_to_raw_lines() {
        let events = vec![
            ParsedEvent::raw(r#"{"type":"noise"}"#),
            ParsedEvent::raw("Here is my plan:"),
            ParsedEvent::raw("1. Read the code"),
        ];
        assert_eq!(
            extract_normalized_plan(&events),
            "Here is my plan:\n1. Read the code"
        );
    }

    #[test]
    fn plan_fallback_keeps_only_trailing_window() {
        let mut events = Vec::new();
        for i in 0..200 {
            events.push(ParsedEvent::raw(format!("line {i}")));
        }
        let plan = extract_normalized_plan(&events);
        assert!(plan.starts_with("line 120"));
        assert!(plan.ends_with("line 199"));
    }

    #[test]
    fn plan_placeholder_when_nothing_extractable() {
        let events = vec![ParsedEvent::raw(r#"{"json":"only"}"#)];
        assert_eq!(extract_normalized_plan(&events), PLAN_PLACEHOLDER);
        assert_eq!(extract_normalized_plan(&[]), PLAN_PLACEHOLDER);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!AgentStatus::Queued.is_terminal());
        assert!(!AgentStatus::Running.is_terminal());
        assert!(AgentStatus::Success.is_terminal());
        assert!(AgentStatus::Error.is_terminal());
        assert!(AgentStatus::Aborted.is_terminal());
        assert!(AgentStatus::Cancelled.is_terminal());
    }
}
