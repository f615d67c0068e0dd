//! Progress notification port
//!
//! The callback surface exposed to the caller during a deliberation run.
//! Implementations live in the presentation layer (console, GUI bridge).
//! Within one agent's stream, callbacks preserve emission order; across
//! agents there is no ordering guarantee, so consumers must key state by
//! agent key.

use council_domain::{AgentStatus, ParsedEvent, Stage};

/// Callbacks for progress updates during a deliberation run.
///
/// All methods default to no-ops so implementors subscribe only to what
/// they render.
pub trait DeliberationProgress: Send + Sync {
    /// A stage boundary was crossed.
    fn on_stage_change(&self, _stage: Stage, _summary: &str) {}

    /// An agent's lifecycle status changed.
    fn on_agent_status(&self, _agent_key: &str, _status: AgentStatus) {}

    /// An agent emitted a normalized event.
    fn on_agent_event(&self, _agent_key: &str, _event: &ParsedEvent) {}

    /// A judge model began streaming its verdict.
    fn on_ranking_model_start(&self, _model: &str) {}

    /// Batched verdict text from a judge (flushed at a fixed interval).
    fn on_ranking_model_chunk(&self, _model: &str, _chunk: &str) {}

    /// A judge finished (successfully or not).
    fn on_ranking_model_complete(&self, _model: &str, _success: bool) {}

    /// The chairman's synthesis call is starting.
    fn on_synthesis_start(&self) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl DeliberationProgress for NoProgress {}
