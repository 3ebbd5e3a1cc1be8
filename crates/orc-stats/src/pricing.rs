use std::collections::HashMap;

/// Per-1,000-token unit prices for one model, plus its JSON-schema capability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
    pub cache_per_1k: f64,
    pub json_schema_capable: bool,
}

/// Immutable-after-construction `model name -> pricing` lookup.
///
/// An unknown model is not an error here: callers interpret a missing entry
/// as zero-cost and JSON-schema-incapable (see [`PricingTable::get`]).
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    models: HashMap<String, ModelPricing>,
}

impl PricingTable {
    /// An empty table. Every lookup falls back to zero-cost/incapable.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> PricingTableBuilder {
        PricingTableBuilder::new()
    }

    /// Builds a table from an iterator of `(model_name, pricing)` pairs, the
    /// injection point a configuration loader would call.
    pub fn from_iter<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, ModelPricing)>,
    {
        Self {
            models: entries.into_iter().collect(),
        }
    }

    /// Inserts or replaces one model's pricing.
    pub fn insert(&mut self, model: impl Into<String>, pricing: ModelPricing) {
        self.models.insert(model.into(), pricing);
    }

    pub fn get(&self, model: &str) -> Option<&ModelPricing> {
        self.models.get(model)
    }

    pub fn is_json_schema_capable(&self, model: &str) -> bool {
        self.models
            .get(model)
            .map(|p| p.json_schema_capable)
            .unwrap_or(false)
    }

    /// `cost = (max(0, input - cached)/1000)*p_input + (cached/1000)*p_cache + (output/1000)*p_output`.
    /// An unknown model prices at zero.
    pub fn cost(&self, model: &str, input_tokens: u64, output_tokens: u64, cached_tokens: u64) -> f64 {
        let Some(pricing) = self.models.get(model) else {
            return 0.0;
        };
        let billable_input = input_tokens.saturating_sub(cached_tokens) as f64;
        (billable_input / 1000.0) * pricing.input_per_1k
            + (cached_tokens as f64 / 1000.0) * pricing.cache_per_1k
            + (output_tokens as f64 / 1000.0) * pricing.output_per_1k
    }
}

/// Inline builder for [`PricingTable`], handy in tests and small setups.
#[derive(Debug, Default)]
pub struct PricingTableBuilder {
    models: HashMap<String, ModelPricing>,
}

impl PricingTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(
        mut self,
        name: impl Into<String>,
        input_per_1k: f64,
        output_per_1k: f64,
        cache_per_1k: f64,
        json_schema_capable: bool,
    ) -> Self {
        self.models.insert(
            name.into(),
            ModelPricing {
                input_per_1k,
                output_per_1k,
                cache_per_1k,
                json_schema_capable,
            },
        );
        self
    }

    pub fn build(self) -> PricingTable {
        PricingTable { models: self.models }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PricingTable {
        PricingTable::builder()
            .model("gpt-test", 1.0, 2.0, 0.5, true)
            .build()
    }

    #[test]
    fn unknown_model_costs_zero() {
        let table = PricingTable::new();
        assert_eq!(table.cost("ghost-model", 1000, 1000, 0), 0.0);
        assert!(!table.is_json_schema_capable("ghost-model"));
    }

    #[test]
    fn cost_accounts_for_cached_tokens_separately() {
        let table = table();
        let cost = table.cost("gpt-test", 1000, 1000, 200);
        let expected = (800.0 / 1000.0) * 1.0 + (200.0 / 1000.0) * 0.5 + (1000.0 / 1000.0) * 2.0;
        assert!((cost - expected).abs() < 1e-9);
    }

    #[test]
    fn json_schema_capability_is_looked_up() {
        let table = table();
        assert!(table.is_json_schema_capable("gpt-test"));
        assert!(!table.is_json_schema_capable("other-model"));
    }

    #[test]
    fn from_iter_constructs_equivalent_table() {
        let pricing = ModelPricing {
            input_per_1k: 0.5,
            output_per_1k: 1.5,
            cache_per_1k: 0.1,
            json_schema_capable: false,
        };
        let table = PricingTable::from_iter([("m".to_string(), pricing)]);
        assert_eq!(table.get("m"), Some(&pricing));
    }
}
