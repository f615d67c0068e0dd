//! Static pricing catalog.
//!
//! Per-MTok prices for the models the default backends run. Maintaining a
//! complete table is outside this system; models missing here estimate to
//! `None` (unknown), never zero.

use council_application::PricingSource;
use council_domain::{ModelPricing, PricingCatalog};

/// Pricing source backed by a built-in catalog.
pub struct StaticPricingSource {
    catalog: PricingCatalog,
}

impl StaticPricingSource {
    pub fn new() -> Self {
        let catalog = PricingCatalog::new()
            .with_entry("claude-opus-4.5", ModelPricing::new(5.0, 25.0))
            .with_entry("claude-sonnet-4.5", ModelPricing::new(3.0, 15.0))
            .with_entry("claude-haiku-4.5", ModelPricing::new(1.0, 5.0))
            .with_entry("gpt-5.2", ModelPricing::new(1.25, 10.0))
            .with_entry("gpt-5.2-codex", ModelPricing::new(1.25, 10.0))
            .with_entry("gpt-5.1", ModelPricing::new(1.25, 10.0))
            .with_entry("gpt-5.1-codex", ModelPricing::new(1.25, 10.0))
            .with_entry("gpt-5.1-codex-mini", ModelPricing::new(0.25, 2.0))
            .with_entry("gemini-3-pro", ModelPricing::new(2.0, 12.0))
            .with_entry("gemini-2.5-pro", ModelPricing::new(1.25, 10.0))
            .with_entry("gemini-2.5-flash", ModelPricing::new(0.3, 2.5));
        Self { catalog }
    }
}

impl Default for StaticPricingSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingSource for StaticPricingSource {
    fn lookup(&self, model_id: &str) -> Option<ModelPricing> {
        self.catalog.lookup(model_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_has_pricing() {
        let source = StaticPricingSource::new();
        assert!(source.lookup("claude-sonnet-4.5").is_some());
    }

    #[test]
    fn provider_prefixed_id_matches_by_suffix() {
        let source = StaticPricingSource::new();
        assert!(source.lookup("anthropic/claude-sonnet-4.5").is_some());
    }

    #[test]
    fn unknown_model_has_no_pricing() {
        let source = StaticPricingSource::new();
        assert!(source.lookup("mystery-model-9000").is_none());
    }
}
