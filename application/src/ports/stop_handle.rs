//! Stoppable-handle capability.
//!
//! Two cancellation shapes exist: killing a subprocess group and
//! cancelling an in-flight session stream. [`StopHandle`] unifies them so
//! the [`RunController`](crate::run_controller::RunController) never
//! special-cases provider kind.

use tokio_util::sync::CancellationToken;

/// A handle that can stop one in-flight agent execution.
///
/// `stop` must be idempotent and must not block: escalation (grace period,
/// force kill) happens asynchronously inside the implementation.
pub trait StopHandle: Send + Sync {
    fn stop(&self);
}

/// Token-backed handle for session-backed executions.
///
/// This is the "zero-pid" pseudo-handle: there is no child process to
/// signal, only a consuming loop to unwind, so stopping is a token cancel.
pub struct TokenStopHandle {
    token: CancellationToken,
}

impl TokenStopHandle {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl StopHandle for TokenStopHandle {
    fn stop(&self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_handle_cancels_token() {
        let token = CancellationToken::new();
        let handle = TokenStopHandle::new(token.clone());
        assert!(!token.is_cancelled());
        handle.stop();
        assert!(token.is_cancelled());
        // Idempotent
        handle.stop();
        assert!(token.is_cancelled());
    }
}
