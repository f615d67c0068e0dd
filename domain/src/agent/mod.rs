//! Agent entities: configuration, execution results, validation.

pub mod config;
pub mod result;
pub mod validation;

pub use config::{AgentConfig, ProviderKind};
pub use result::{AgentResult, AgentStatus, extract_normalized_plan};
pub use validation::{ConfigIssue, ConfigIssueCode, validate_agents};
