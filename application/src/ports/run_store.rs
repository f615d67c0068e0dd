//! Run store port
//!
//! The orchestrator emits one complete run record when the pipeline
//! settles; it consumes nothing back during a run. Persistence details
//! (layout, rotation) are outside this system.

use council_domain::DeliberationRun;

/// Sink for completed run records.
pub trait RunStore: Send + Sync {
    /// Record a settled run. Failures are the store's problem; the
    /// pipeline result never depends on persistence succeeding.
    fn record(&self, run: &DeliberationRun);
}

/// Discards run records.
pub struct NoRunStore;

impl RunStore for NoRunStore {
    fn record(&self, _run: &DeliberationRun) {}
}
