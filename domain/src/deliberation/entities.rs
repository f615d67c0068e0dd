//! Deliberation run entities.

use crate::agent::config::AgentConfig;
use crate::agent::result::AgentResult;
use crate::deliberation::value_objects::{
    AggregateRanking, JudgeResult, Stage1Result, SynthesisOutcome,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three fixed stages of a deliberation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Compete,
    Judge,
    Synthesize,
}

impl Stage {
    pub fn number(&self) -> u8 {
        match self {
            Stage::Compete => 1,
            Stage::Judge => 2,
            Stage::Synthesize => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Compete => "compete",
            Stage::Judge => "judge",
            Stage::Synthesize => "synthesize",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Complete record of one deliberation run, emitted to the run store when
/// the pipeline settles. Degradations (skipped judging, failed synthesis)
/// are recorded as human-readable `notes`, never as absent fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliberationRun {
    pub prompt: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub agents: Vec<AgentConfig>,
    pub results: Vec<AgentResult>,
    pub stage1: Vec<Stage1Result>,
    pub judges: Vec<JudgeResult>,
    pub aggregate: Vec<AggregateRanking>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<SynthesisOutcome>,
    pub notes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_numbers_are_fixed() {
        assert_eq!(Stage::Compete.number(), 1);
        assert_eq!(Stage::Judge.number(), 2);
        assert_eq!(Stage::Synthesize.number(), 3);
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::Judge.to_string(), "judge");
    }
}
