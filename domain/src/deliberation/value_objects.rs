//! Deliberation value objects - immutable result types for each stage.
//!
//! - [`Stage1Result`] - a successful candidate from the compete stage
//! - [`JudgeResult`] - one judge's verdict over the anonymized candidates
//! - [`AggregateRanking`] - per-model mean rank across all judges
//! - [`SynthesisOutcome`] - the chairman's final answer

use crate::usage::TokenUsage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A successful candidate response from the compete stage.
///
/// Derived from `success`-status agent results only; errored, aborted and
/// cancelled agents never reach the judges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage1Result {
    /// Identity the rankings aggregate over (the agent's display name).
    pub model: String,
    pub response: String,
}

impl Stage1Result {
    pub fn new(model: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            response: response.into(),
        }
    }
}

/// One judge's verdict: the raw ranking text plus the labels extracted
/// from it, in order. An empty `parsed_ranking` means the judge responded
/// but no ranking could be recovered; that judge simply contributes no
/// positions to the aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeResult {
    pub model: String,
    pub ranking_text: String,
    pub parsed_ranking: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
}

/// Mean 1-based rank for one model across every judge that mentioned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRanking {
    pub model: String,
    /// Average rank position, rounded to 2 decimals. Lower is better.
    pub average_rank: f64,
    /// Number of judge rankings that mentioned this model.
    pub rankings_count: usize,
}

/// The chairman's synthesis, or the degraded fallback when judging or
/// synthesis could not proceed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisOutcome {
    pub model: String,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
}

impl SynthesisOutcome {
    pub fn new(model: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            response: response.into(),
            usage: None,
            estimated_cost: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage, estimated_cost: Option<f64>) -> Self {
        self.usage = Some(usage);
        self.estimated_cost = estimated_cost;
        self
    }
}
