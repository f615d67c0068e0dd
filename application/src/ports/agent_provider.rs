//! Agent provider port
//!
//! Defines the capability every backend must satisfy: model discovery and
//! prompt execution with streaming callbacks and cancellation. Providers
//! own the cancellation mechanics for their backend (process-group kill or
//! stream abort) and register a [`StopHandle`](super::stop_handle::StopHandle)
//! with the run controller for the duration of each execution.

use crate::ports::progress::DeliberationProgress;
use crate::run_controller::RunController;
use async_trait::async_trait;
use council_domain::{AgentConfig, AgentResult, ProviderKind};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors from provider operations that are not per-agent execution
/// failures (those are carried inside [`AgentResult`] as data).
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Discovery failed: {0}")]
    DiscoveryFailed(String),
}

/// Everything an execution needs besides its config and prompt.
///
/// The per-agent `cancel` token is independent of run-wide cancellation:
/// executions classify their own terminal status by consulting
/// `controller.is_cancelled()` first, then their own token.
#[derive(Clone)]
pub struct ExecutionContext {
    pub controller: Arc<RunController>,
    pub progress: Arc<dyn DeliberationProgress>,
    pub cancel: CancellationToken,
    /// Optional image attachments forwarded to backends that accept them.
    pub images: Vec<PathBuf>,
}

impl ExecutionContext {
    pub fn new(controller: Arc<RunController>, progress: Arc<dyn DeliberationProgress>) -> Self {
        Self {
            controller,
            progress,
            cancel: CancellationToken::new(),
            images: Vec::new(),
        }
    }

    pub fn with_images(mut self, images: Vec<PathBuf>) -> Self {
        self.images = images;
        self
    }
}

/// Capability interface over the closed set of backend kinds.
///
/// `execute` never returns an error: every failure mode (spawn failure,
/// backend exception, cancellation) is represented as a terminal status on
/// the returned [`AgentResult`], so one agent's failure cannot abort its
/// siblings.
#[async_trait]
pub trait AgentProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// List the models this backend can run.
    async fn discover_models(&self) -> Result<Vec<String>, ProviderError>;

    /// Run one agent to completion, streaming normalized events through
    /// `ctx.progress` as they are produced.
    async fn execute(&self, config: &AgentConfig, prompt: &str, ctx: ExecutionContext)
    -> AgentResult;
}

/// Maps provider kinds to their implementations.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn AgentProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, provider: Arc<dyn AgentProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn AgentProvider>> {
        self.providers.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.providers.keys().copied().collect()
    }

    /// Union of every registered backend's discovered models, with the
    /// kind they belong to. A backend that fails discovery contributes
    /// nothing rather than failing the whole listing.
    pub async fn discover_all_models(&self) -> Vec<(ProviderKind, String)> {
        let mut models = Vec::new();
        for (kind, provider) in &self.providers {
            match provider.discover_models().await {
                Ok(list) => models.extend(list.into_iter().map(|m| (*kind, m))),
                Err(e) => tracing::warn!("model discovery failed for {kind}: {e}"),
            }
        }
        models
    }
}
