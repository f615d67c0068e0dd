//! Run controller: cancellation registry for one deliberation run.
//!
//! Tracks a stop handle for every in-flight execution, keyed by agent key.
//! The registry is the only state mutated concurrently by multiple
//! execution tasks; a plain mutex suffices at this fan-out width (2-5).
//! The controller holds non-owning references to cancellation handles,
//! never to result data, and lives exactly as long as its run.

use crate::ports::stop_handle::StopHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Per-run cancellation state: `active → cancelled`, one-way.
#[derive(Default)]
pub struct RunController {
    handles: Mutex<HashMap<String, Arc<dyn StopHandle>>>,
    cancelled: AtomicBool,
}

impl RunController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry access that recovers from poisoning: a stop handle that
    /// panicked while the lock was held must not disable cancellation
    /// for its siblings. The map is valid after any partial mutation.
    fn registry(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn StopHandle>>> {
        self.handles.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register an execution's stop handle. Safe under concurrent calls
    /// from multiple in-flight executions.
    pub fn register(&self, agent_key: impl Into<String>, handle: Arc<dyn StopHandle>) {
        let key = agent_key.into();
        debug!(agent_key = %key, "registering stop handle");
        self.registry().insert(key, handle);
    }

    /// Remove an execution's handle, typically on natural completion.
    /// Unknown keys are ignored (the handle may already have been cleared
    /// by a racing `cancel`).
    pub fn unregister(&self, agent_key: &str) {
        self.registry().remove(agent_key);
    }

    /// Cancel the whole run: set the flag, stop every registered handle,
    /// clear the registry. Idempotent; tolerates an empty registry and
    /// handles that already self-unregistered.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let handles: Vec<(String, Arc<dyn StopHandle>)> =
            self.registry().drain().collect();
        info!(count = handles.len(), "cancelling run");
        for (key, handle) in handles {
            debug!(agent_key = %key, "stopping agent");
            handle.stop();
        }
    }

    /// Cancel exactly one agent, leaving siblings untouched.
    /// Returns whether a live handle was found.
    pub fn cancel_agent(&self, agent_key: &str) -> bool {
        let handle = self.registry().remove(agent_key);
        match handle {
            Some(handle) => {
                info!(agent_key, "cancelling single agent");
                handle.stop();
                true
            }
            None => false,
        }
    }

    /// Whether run-wide cancellation is in effect. Executions consult this
    /// first when classifying their own terminal status.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    fn registered_count(&self) -> usize {
        self.registry().len()
    }
}
