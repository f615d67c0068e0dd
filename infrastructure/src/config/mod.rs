//! Configuration: TOML files with figment layering.

pub mod file_config;
pub mod loader;

pub use file_config::{ChairmanConfig, FileAgentConfig, FileConfig, JudgesConfig, RunConfig};
pub use loader::ConfigLoader;
