//! Domain layer for agent-council
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Deliberation
//!
//! A deliberation run puts several independent coding-assistant agents to
//! work on the same task and settles the outcome in three fixed stages:
//!
//! - **Compete**: every enabled agent produces a candidate plan
//! - **Judge**: a panel of judge models ranks the anonymized candidates
//! - **Synthesize**: a chairman model combines candidates and verdicts
//!
//! ## Canonical events
//!
//! Every backend, whatever its native streaming format, is normalized into
//! the five-way [`EventKind`] taxonomy carried by [`ParsedEvent`].

pub mod agent;
pub mod core;
pub mod deliberation;
pub mod event;
pub mod prompt;
pub mod usage;
pub mod util;

// Re-export commonly used types
pub use agent::{
    config::{AgentConfig, ProviderKind},
    result::{AgentResult, AgentStatus, extract_normalized_plan},
    validation::{ConfigIssue, ConfigIssueCode, validate_agents},
};
pub use core::error::DomainError;
pub use deliberation::{
    entities::{DeliberationRun, Stage},
    ranking::{aggregate_rankings, assign_labels, parse_ranking},
    value_objects::{AggregateRanking, JudgeResult, Stage1Result, SynthesisOutcome},
};
pub use event::{EventKind, ParsedEvent};
pub use prompt::PromptTemplate;
pub use usage::{ModelPricing, PricingCatalog, TokenUsage, UsageAccumulator};
pub use util::{looks_like_json, strip_ansi, truncate_str};
