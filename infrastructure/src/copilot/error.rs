//! Error types for the copilot transport

use thiserror::Error;

/// Result type alias for copilot transport operations
pub type Result<T> = std::result::Result<T, CopilotError>;

/// Errors that can occur when communicating with the copilot CLI
#[derive(Error, Debug)]
pub enum CopilotError {
    #[error("Failed to spawn copilot process: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("JSON-RPC error (code {code}): {message}")]
    Rpc { code: i64, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Transport closed")]
    TransportClosed,

    #[error("Reader task stopped")]
    RouterStopped,

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,
}
