use crate::client::InferenceClient;
use crate::enrich::{IdentityEnricher, PromptEnricher};
use crate::orchestrator::Orchestrator;
use orc_core::{ConfigError, OrchestratorError};
use orc_stats::PricingTable;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for an [`Orchestrator`].
pub struct OrchestratorConfig {
    pub(crate) model: String,
    pub(crate) temperature: f64,
    pub(crate) max_tokens: Option<u32>,
    pub(crate) pricing_table: PricingTable,
    pub(crate) max_tpm: u64,
    pub(crate) initial_concurrency: usize,
    pub(crate) max_attempts: usize,
    pub(crate) retry_wait: Duration,
    pub(crate) name: String,
    pub(crate) client: Arc<dyn InferenceClient>,
    pub(crate) enricher: Arc<dyn PromptEnricher>,
}

/// Builder for [`OrchestratorConfig`].
pub struct OrchestratorConfigBuilder {
    model: Option<String>,
    temperature: f64,
    max_tokens: Option<u32>,
    pricing_table: PricingTable,
    max_tpm: u64,
    initial_concurrency: usize,
    max_attempts: usize,
    retry_wait: Duration,
    name: String,
    client: Option<Arc<dyn InferenceClient>>,
    enricher: Arc<dyn PromptEnricher>,
}

impl OrchestratorConfigBuilder {
    /// Defaults: `temperature: 0.7`, `initial_concurrency: 10`,
    /// `max_attempts: 3`, `retry_wait: 1s`, `name: "<unnamed>"`, an empty
    /// pricing table, and the identity prompt enricher. `model`, `max_tpm`,
    /// and `client` have no sensible default and must be set explicitly.
    pub fn new() -> Self {
        Self {
            model: None,
            temperature: 0.7,
            max_tokens: None,
            pricing_table: PricingTable::new(),
            max_tpm: 0,
            initial_concurrency: 10,
            max_attempts: 3,
            retry_wait: Duration::from_secs(1),
            name: "<unnamed>".to_string(),
            client: None,
            enricher: Arc::new(IdentityEnricher),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn pricing_table(mut self, pricing_table: PricingTable) -> Self {
        self.pricing_table = pricing_table;
        self
    }

    /// Sets the provider's tokens-per-minute ceiling. Required.
    pub fn max_tpm(mut self, max_tpm: u64) -> Self {
        self.max_tpm = max_tpm;
        self
    }

    pub fn initial_concurrency(mut self, concurrency: usize) -> Self {
        self.initial_concurrency = concurrency;
        self
    }

    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn retry_wait(mut self, wait: Duration) -> Self {
        self.retry_wait = wait;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the remote inference capability. Required.
    pub fn client(mut self, client: Arc<dyn InferenceClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn enricher(mut self, enricher: Arc<dyn PromptEnricher>) -> Self {
        self.enricher = enricher;
        self
    }

    pub fn build(self) -> Result<Orchestrator, OrchestratorError> {
        let model = self.model.ok_or(OrchestratorError::Internal(
            "model is required".to_string(),
        ))?;
        let client = self.client.ok_or(OrchestratorError::Internal(
            "client is required".to_string(),
        ))?;
        if self.max_tpm == 0 {
            return Err(ConfigError::NonPositiveMaxTpm { max_tpm: 0 }.into());
        }

        let config = OrchestratorConfig {
            model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            pricing_table: self.pricing_table,
            max_tpm: self.max_tpm,
            initial_concurrency: self.initial_concurrency,
            max_attempts: self.max_attempts,
            retry_wait: self.retry_wait,
            name: self.name,
            client,
            enricher: self.enricher,
        };
        Orchestrator::new(config)
    }
}

impl Default for OrchestratorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
