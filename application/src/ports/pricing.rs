//! Pricing source port
//!
//! Cost estimation needs per-model prices; the table itself is maintained
//! outside this system. A missing entry means the cost is unknown (`None`),
//! which is a different fact from free.

use council_domain::ModelPricing;

/// Lookup of per-model pricing by model id.
pub trait PricingSource: Send + Sync {
    fn lookup(&self, model_id: &str) -> Option<ModelPricing>;
}

/// Pricing source with no data: every cost estimate is `None`.
pub struct NoPricing;

impl PricingSource for NoPricing {
    fn lookup(&self, _model_id: &str) -> Option<ModelPricing> {
        None
    }
}
