//! Normalizer for the gemini CLI's plain-text output.
//!
//! The backend streams no structured events: lines are prose, possibly
//! colored, with a few recognizable side-channel notices. Everything else
//! is kept as `raw`; the plan extractor mines the trailing raw lines when
//! a backend never produced `text` events.

use crate::normalize::normalize_plain_line;
use council_domain::ParsedEvent;

/// Normalize one line of gemini CLI output.
///
/// All classification lives in [`normalize_plain_line`]; gemini has no
/// structured stream of its own.
pub fn normalize_gemini_line(line: &str) -> Vec<ParsedEvent> {
    normalize_plain_line(line)
}
