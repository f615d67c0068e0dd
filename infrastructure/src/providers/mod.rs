//! Backend providers.
//!
//! One [`AgentProvider`](council_application::AgentProvider) per backend
//! kind. The three process-backed providers share the subprocess engine in
//! [`process`]; the copilot provider is session-backed and rides the
//! shared transport.
//!
//! Every provider constructs its backend invocation with explicit
//! read-only, non-destructive constraints. The agents explore a repository
//! and write prose; nothing they run may change state.

pub mod claude;
pub mod codex;
pub mod copilot;
pub mod gemini;
pub mod process;

use std::path::PathBuf;

/// Append attached image paths to a prompt for backends that take
/// attachments in-band rather than as flags.
pub(crate) fn attach_images(prompt: &str, images: &[PathBuf]) -> String {
    if images.is_empty() {
        return prompt.to_string();
    }
    let mut out = String::from(prompt);
    out.push_str("\n\nAttached images:\n");
    for image in images {
        out.push_str(&format!("- {}\n", image.display()));
    }
    out
}
