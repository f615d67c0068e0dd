//! Shared copilot CLI transport.
//!
//! The copilot CLI runs as a single server process (`copilot --server`)
//! speaking JSON-RPC 2.0 over one TCP connection. Both the session-backed
//! agent provider and the judge/chairman model gateway ride this transport;
//! it is spawned lazily once per process and shared (see
//! [`transport::shared_transport`]).

pub mod error;
pub mod gateway;
pub mod protocol;
pub mod transport;

pub use error::{CopilotError, Result};
pub use transport::{CopilotTransport, SessionChannel, shared_transport, shutdown_shared};
