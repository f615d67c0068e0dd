//! Model gateway port
//!
//! Judges and the chairman are plain model calls, not agent runs: one
//! prompt in, streamed text out. The production adapter rides the shared
//! copilot transport in the infrastructure layer.

use async_trait::async_trait;
use council_domain::TokenUsage;
use thiserror::Error;

/// Errors that can occur during model gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Transport closed")]
    TransportClosed,
}

/// Completed reply from one model call.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// Gateway for direct model completions.
///
/// `on_chunk` receives incremental text as the model streams; the full
/// text is also returned in the reply so callers that only need the final
/// answer can ignore the stream.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn complete_streaming(
        &self,
        model: &str,
        prompt: &str,
        on_chunk: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<ModelReply, GatewayError>;

    /// Convenience wrapper when streaming is not needed.
    async fn complete(&self, model: &str, prompt: &str) -> Result<ModelReply, GatewayError> {
        self.complete_streaming(model, prompt, &|_| {}).await
    }
}
