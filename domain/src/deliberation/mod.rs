//! Deliberation entities: stage results, rankings, run records.

pub mod entities;
pub mod ranking;
pub mod value_objects;

pub use entities::{DeliberationRun, Stage};
pub use ranking::{aggregate_rankings, assign_labels, parse_ranking};
pub use value_objects::{AggregateRanking, JudgeResult, Stage1Result, SynthesisOutcome};
