//! Per-backend event normalization.
//!
//! One pure function per backend, mapping a raw output line (or session
//! event payload) to zero or more canonical
//! [`ParsedEvent`](council_domain::ParsedEvent)s. Purity is load-bearing:
//! given identical input the output is identical, which keeps normalization
//! reproducible under test and free of hidden per-stream state.
//!
//! Token-usage tagging differs by backend and must not be mixed up:
//! claude and codex report a cumulative running total (replaces), copilot
//! reports per-step deltas (sums), gemini reports nothing.

pub mod claude;
pub mod codex;
pub mod copilot;
pub mod gemini;

pub use claude::normalize_claude_line;
pub use codex::normalize_codex_line;
pub use copilot::normalize_copilot_event;
pub use gemini::normalize_gemini_line;

use council_domain::{ParsedEvent, strip_ansi};

/// Notices the CLIs print to stderr/stdout that are backend lifecycle
/// chatter rather than answer content.
const STATUS_PREFIXES: &[&str] = &[
    "Loaded cached credentials",
    "Data collection is",
    "Waiting for auth",
];

/// Detect a published share link in a line of output.
///
/// Returns the URL when the line is a share-link notice.
pub fn detect_share_link(line: &str) -> Option<&str> {
    let url_start = line.find("https://")?;
    let url = line[url_start..]
        .split_whitespace()
        .next()
        .unwrap_or_default();
    if url.contains("share") || url.contains("goo.gle") {
        Some(url)
    } else {
        None
    }
}

/// Shared path for unstructured output lines.
///
/// Gemini routes every line through here; claude and codex fall back to
/// it when a line fails to parse as JSON, so status chatter and share
/// links printed outside the structured stream classify the same way
/// for every backend.
pub fn normalize_plain_line(line: &str) -> Vec<ParsedEvent> {
    let clean = strip_ansi(line);
    let trimmed = clean.trim_end();
    if trimmed.trim().is_empty() {
        return Vec::new();
    }

    if let Some(url) = detect_share_link(trimmed) {
        return vec![ParsedEvent::status(format!("share link: {url}"), trimmed)];
    }

    if STATUS_PREFIXES.iter().any(|p| trimmed.trim_start().starts_with(p)) {
        return vec![ParsedEvent::status(trimmed.trim_start(), trimmed)];
    }

    vec![ParsedEvent::raw(trimmed)]
}
