//! Ports: interfaces the application layer depends on.
//!
//! Implementations (adapters) live in the infrastructure layer, null
//! implementations for tests and optional features live alongside the
//! trait definitions.

pub mod agent_provider;
pub mod model_gateway;
pub mod pricing;
pub mod progress;
pub mod run_store;
pub mod stop_handle;
