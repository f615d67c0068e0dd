//! Application layer for agent-council
//!
//! Use cases and ports. This crate orchestrates the three-stage
//! deliberation pipeline over the [`ports`] it defines; adapters for those
//! ports (backend providers, the model gateway, stores) live in the
//! infrastructure layer.

pub mod ports;
pub mod run_controller;
pub mod use_cases;

pub use ports::agent_provider::{
    AgentProvider, ExecutionContext, ProviderError, ProviderRegistry,
};
pub use ports::model_gateway::{GatewayError, ModelGateway, ModelReply};
pub use ports::pricing::{NoPricing, PricingSource};
pub use ports::progress::{DeliberationProgress, NoProgress};
pub use ports::run_store::{NoRunStore, RunStore};
pub use ports::stop_handle::{StopHandle, TokenStopHandle};
pub use run_controller::RunController;
pub use use_cases::run_deliberation::{
    RunDeliberationError, RunDeliberationInput, RunDeliberationUseCase,
};
