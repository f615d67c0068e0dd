//! Use cases

pub mod run_deliberation;

pub use run_deliberation::{RunDeliberationError, RunDeliberationInput, RunDeliberationUseCase};
