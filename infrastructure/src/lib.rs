//! Infrastructure layer for agent-council
//!
//! Adapters for the ports defined in the application layer:
//!
//! - [`providers`]: one [`AgentProvider`](council_application::AgentProvider)
//!   per backend: three process-backed CLIs (claude, codex, gemini) sharing
//!   one subprocess engine, and the session-backed copilot provider riding
//!   the shared transport.
//! - [`normalize`]: pure per-backend functions turning raw streaming
//!   output into the canonical event taxonomy.
//! - [`copilot`]: JSON-RPC transport to the copilot CLI server process,
//!   shared lazily across the whole process.
//! - [`config`]: TOML configuration files with figment layering.
//! - [`pricing`] / [`store`]: static pricing catalog and JSONL run records.

pub mod config;
pub mod copilot;
pub mod normalize;
pub mod pricing;
pub mod providers;
pub mod store;

pub use config::{ConfigLoader, FileConfig};
pub use copilot::gateway::CopilotModelGateway;
pub use pricing::StaticPricingSource;
pub use providers::{
    claude::ClaudeProvider, codex::CodexProvider, copilot::CopilotProvider,
    gemini::GeminiProvider,
};
pub use store::JsonlRunStore;
