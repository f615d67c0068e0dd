//! Token-usage accounting and cost estimation.
//!
//! Backends report usage in two incompatible styles: some emit a single
//! authoritative running total on a terminal event, others emit per-step
//! deltas that must be summed. [`UsageAccumulator`] encodes the merge law
//! once so providers and the orchestrator cannot disagree about it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Token counts and (when known) cost for one agent or one model call.
///
/// `total_cost` is `None` when the backend did not report a cost and no
/// pricing data is available. A missing cost is a different fact from a
/// zero cost and is never coerced to `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_cost: None,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.total_cost = Some(cost);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.input_tokens == 0 && self.output_tokens == 0 && self.total_cost.is_none()
    }
}

/// Accumulates usage reports for one agent according to the merge law:
/// a cumulative report replaces everything seen so far; a delta adds on top.
///
/// The final total therefore equals the last cumulative report plus the sum
/// of all deltas emitted strictly after it.
#[derive(Debug, Clone, Default)]
pub struct UsageAccumulator {
    total: TokenUsage,
}

impl UsageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one usage report. `cumulative` mirrors
    /// [`ParsedEvent::usage_is_cumulative`](crate::event::ParsedEvent).
    pub fn apply(&mut self, usage: &TokenUsage, cumulative: bool) {
        if cumulative {
            self.total = usage.clone();
            return;
        }
        self.total.input_tokens += usage.input_tokens;
        self.total.output_tokens += usage.output_tokens;
        self.total.total_cost = match (self.total.total_cost, usage.total_cost) {
            (Some(a), Some(b)) => Some(a + b),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
    }

    /// The accumulated total so far.
    pub fn total(&self) -> &TokenUsage {
        &self.total
    }

    pub fn into_total(self) -> TokenUsage {
        self.total
    }
}

/// Per-million-token prices for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub prompt_price_per_mtok: f64,
    pub completion_price_per_mtok: f64,
}

impl ModelPricing {
    pub const fn new(prompt_price_per_mtok: f64, completion_price_per_mtok: f64) -> Self {
        Self {
            prompt_price_per_mtok,
            completion_price_per_mtok,
        }
    }

    /// Estimate USD cost for the given usage.
    pub fn estimate(&self, usage: &TokenUsage) -> f64 {
        let prompt = usage.input_tokens as f64 * self.prompt_price_per_mtok / 1_000_000.0;
        let completion = usage.output_tokens as f64 * self.completion_price_per_mtok / 1_000_000.0;
        prompt + completion
    }
}

/// Pricing lookup keyed by model id.
///
/// Lookup is exact first, then by suffix so that provider-prefixed ids
/// ("openai/gpt-5.2" vs "gpt-5.2") resolve to the same entry. Missing
/// pricing yields `None`, never a zero price.
#[derive(Debug, Clone, Default)]
pub struct PricingCatalog {
    entries: HashMap<String, ModelPricing>,
}

impl PricingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, model_id: impl Into<String>, pricing: ModelPricing) -> Self {
        self.entries.insert(model_id.into(), pricing);
        self
    }

    pub fn lookup(&self, model_id: &str) -> Option<ModelPricing> {
        if let Some(pricing) = self.entries.get(model_id) {
            return Some(*pricing);
        }
        // Suffix match tolerates provider prefixes on either side
        self.entries
            .iter()
            .find(|(key, _)| model_id.ends_with(key.as_str()) || key.ends_with(model_id))
            .map(|(_, pricing)| *pricing)
    }

    /// Estimate cost for a model call, or `None` when the model is unpriced.
    pub fn estimate_cost(&self, model_id: &str, usage: &TokenUsage) -> Option<f64> {
        self.lookup(model_id).map(|p| p.estimate(usage))
    }
}
