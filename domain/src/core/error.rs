//! Domain error types

use thiserror::Error;

/// Conditions that make a deliberation run impossible to start or finish.
/// Per-agent failures are never errors; they are carried as result data.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("No agents configured for the run")]
    NoAgents,

    #[error("No responses to judge")]
    NoResponses,

    #[error("Invalid agent config: {0}")]
    InvalidAgentConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_the_issue_text() {
        let e = DomainError::InvalidAgentConfig("agent 'x' has no model".to_string());
        assert_eq!(e.to_string(), "Invalid agent config: agent 'x' has no model");
    }
}
