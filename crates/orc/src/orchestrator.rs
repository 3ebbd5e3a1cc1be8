use crate::batch::{normalize_items, BatchItem};
use crate::classify::{extract_wait_time, is_rate_limit_message};
use crate::client::{InferenceClient, InferenceRequest, Message, ResponseFormat};
use crate::config::OrchestratorConfig;
use crate::enrich::PromptEnricher;
use crate::template::format_prompt;
use chrono::Utc;
use orc_core::{ConfigError, OrchestratorError};
use orc_ratelimiter::AdaptiveRateLimiter;
use orc_retry::RetryPolicy;
use orc_stats::{ErrorDetails, ParsedContent, PricingTable, ProgressTracker, RateLimiterEventKind, RequestOutcome, RequestRecord, StatsManager};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// The result of a completed batch.
#[derive(Debug)]
pub struct BatchResult {
    pub results: Vec<RequestOutcome>,
    pub batch_stats: orc_stats::StatsContainer,
    pub batch_id: String,
}

struct Inner {
    model: String,
    temperature: f64,
    max_tokens: Option<u32>,
    pricing_table: PricingTable,
    client: Arc<dyn InferenceClient>,
    enricher: Arc<dyn PromptEnricher>,
    limiter: AdaptiveRateLimiter,
    retry: RetryPolicy,
    stats: Arc<StatsManager>,
}

/// Fans work out to a remote [`InferenceClient`] under an
/// [`AdaptiveRateLimiter`], retrying transient failures and aggregating
/// statistics via a [`StatsManager`].
///
/// Cheaply `Clone`-able; all clones share the same underlying state.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("model", &self.inner.model)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn builder() -> crate::config::OrchestratorConfigBuilder {
        crate::config::OrchestratorConfigBuilder::new()
    }

    pub(crate) fn new(config: OrchestratorConfig) -> Result<Self, OrchestratorError> {
        let stats = Arc::new(StatsManager::new(config.pricing_table.clone()));
        let stats_ref_a = Arc::clone(&stats);
        let stats_ref_b = Arc::clone(&stats);
        let stats_ref_c = Arc::clone(&stats);

        let limiter = AdaptiveRateLimiter::builder()
            .max_tpm(config.max_tpm)
            .initial_concurrency(config.initial_concurrency)
            .name(config.name.clone())
            .on_proactive_pause(move |wait_time| {
                stats_ref_a.record_rate_limiter_event(
                    RateLimiterEventKind::ProactivePause { wait_time },
                    None,
                );
            })
            .on_api_rate_limit_detected(move |_wait_time| {
                stats_ref_b.record_rate_limiter_event(RateLimiterEventKind::ApiRateLimitDetected, None);
            })
            .on_token_usage_update(move |current_tpm| {
                stats_ref_c.record_rate_limiter_event(
                    RateLimiterEventKind::TokenUsageUpdate { current_tpm },
                    None,
                );
            })
            .build()?;

        let retry = RetryPolicy::builder()
            .max_attempts(config.max_attempts)
            .wait(config.retry_wait)
            .name(config.name.clone())
            .build();

        Ok(Self {
            inner: Arc::new(Inner {
                model: config.model,
                temperature: config.temperature,
                max_tokens: config.max_tokens,
                pricing_table: config.pricing_table,
                client: config.client,
                enricher: config.enricher,
                limiter,
                retry,
                stats,
            }),
        })
    }

    pub fn get_stats_manager(&self) -> &StatsManager {
        self.inner.stats.as_ref()
    }

    /// Formats `text` through the enricher and `prompt_template`, runs one
    /// end-to-end request with retry, and emits telemetry to the global
    /// scope only.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(action = "process_single")))]
    pub async fn process_single(
        &self,
        text: &str,
        prompt_template: &str,
        json_schema: Option<ResponseFormat>,
        custom_id: Option<String>,
        template_kwargs: &HashMap<String, String>,
    ) -> Result<RequestOutcome, OrchestratorError> {
        self.check_json_schema_capability(json_schema.as_ref())?;

        let enriched = self.inner.enricher.enrich(text, template_kwargs).await;
        let prompt = format_prompt(prompt_template, &enriched, template_kwargs);
        let id = custom_id.unwrap_or_else(|| format!("single_{}", Utc::now().timestamp_nanos_opt().unwrap_or(0)));

        let outcome = self
            .execute_item(id, prompt, json_schema, None, None)
            .await;
        Ok(outcome)
    }

    /// Mangles the batch id, normalizes `custom_ids`, fans one task out per
    /// item, and awaits all of them before returning ordered results.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(action = "process_batch")))]
    pub async fn process_batch(
        &self,
        texts: &[String],
        prompt_template: &str,
        json_schema: Option<ResponseFormat>,
        batch_id: Option<&str>,
        custom_ids: Option<&[Option<String>]>,
        template_kwargs: &HashMap<String, String>,
    ) -> Result<BatchResult, OrchestratorError> {
        self.check_json_schema_capability(json_schema.as_ref())?;

        let batch_id = crate::batch::make_batch_id(batch_id);
        let items = normalize_items(&batch_id, texts, custom_ids)?;

        self.inner.stats.start_batch(batch_id.clone());
        let tracker = Arc::new(ProgressTracker::new(items.len() as u64));

        let tasks = items.into_iter().map(|item: BatchItem| {
            let this = self.clone();
            let template = prompt_template.to_string();
            let schema = json_schema.clone();
            let kwargs = template_kwargs.clone();
            let batch_id = batch_id.clone();
            let tracker = Arc::clone(&tracker);
            let index = item.index;
            tokio::spawn(async move {
                let enriched = this.inner.enricher.enrich(&item.text, &kwargs).await;
                let prompt = format_prompt(&template, &enriched, &kwargs);
                let id = item
                    .custom_id
                    .unwrap_or_else(|| crate::batch::synthesize_id(&batch_id, index));
                let outcome = this
                    .execute_item(id, prompt, schema, Some(&batch_id), Some(&tracker))
                    .await;
                (index, outcome)
            })
        });

        let mut indexed: Vec<(usize, RequestOutcome)> = Vec::with_capacity(texts.len());
        for task in tasks {
            match task.await {
                Ok(pair) => indexed.push(pair),
                Err(join_err) => {
                    if join_err.is_panic() {
                        std::panic::resume_unwind(join_err.into_panic());
                    }
                }
            }
        }
        indexed.sort_by_key(|(index, _)| *index);
        let results = indexed.into_iter().map(|(_, outcome)| outcome).collect();

        let batch_stats = self
            .inner
            .stats
            .end_batch(&batch_id)
            .unwrap_or_else(|| panic!("batch {batch_id} was closed by another task"));

        #[cfg(feature = "tracing")]
        tracing::info!(
            action = "batch_complete",
            batch_id = %batch_id,
            summary = %self.inner.stats.get_summary(Some(batch_id.as_str())),
        );

        Ok(BatchResult {
            results,
            batch_stats,
            batch_id,
        })
    }

    fn check_json_schema_capability(&self, schema: Option<&ResponseFormat>) -> Result<(), OrchestratorError> {
        if schema.is_some() && !self.inner.pricing_table.is_json_schema_capable(&self.inner.model) {
            return Err(ConfigError::JsonSchemaUnsupported {
                model: self.inner.model.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Runs the 8-step per-item execution shared by `process_single` and
    /// `process_batch`: acquire a slot, retry against the remote client,
    /// report completion back to the limiter, and fold the outcome into
    /// stats.
    async fn execute_item(
        &self,
        id: String,
        prompt: String,
        schema: Option<ResponseFormat>,
        batch_id: Option<&str>,
        tracker: Option<&Arc<ProgressTracker>>,
    ) -> RequestOutcome {
        let start_timestamp = Utc::now();
        let start_instant = Instant::now();

        let permit = self.inner.limiter.await_permission_to_proceed().await;
        self.inner.stats.record_concurrent_start(batch_id);

        let last_attempt = Arc::new(AtomicUsize::new(0));
        let messages = vec![Message {
            role: "user".to_string(),
            content: prompt,
        }];

        let attempt_counter = Arc::clone(&last_attempt);
        let schema_for_request = schema.clone();
        let result = self
            .inner
            .retry
            .execute(move |attempt| {
                attempt_counter.store(attempt, Ordering::SeqCst);
                let client = Arc::clone(&self.inner.client);
                let limiter = self.inner.limiter.clone();
                let request = InferenceRequest {
                    model: self.inner.model.clone(),
                    messages: messages.clone(),
                    temperature: self.inner.temperature,
                    max_tokens: self.inner.max_tokens,
                    response_format: schema_for_request.clone(),
                };
                async move {
                    match client.submit(request).await {
                        Ok(response) => Ok(response),
                        Err(err) => {
                            if is_rate_limit_message(&err.message) {
                                let wait = extract_wait_time(&err.message, err.retry_after);
                                limiter.record_api_rate_limit(wait);
                            }
                            Err(err)
                        }
                    }
                }
            })
            .await;

        let attempts = last_attempt.load(Ordering::SeqCst).max(1) as u32;
        let api_response_time = start_instant.elapsed().as_secs_f64();

        let (outcome, total_tokens, success) = match result {
            Ok(response) => {
                let usage = response.usage;
                let cached = usage.cached_tokens.unwrap_or(0) as u64;
                let cost = self.inner.pricing_table.cost(
                    &self.inner.model,
                    usage.prompt_tokens,
                    usage.completion_tokens,
                    cached,
                );
                let parsed = schema
                    .as_ref()
                    .and_then(|_| serde_json::from_str(&response.content).ok())
                    .map(ParsedContent::Json);
                let outcome = RequestOutcome::success(
                    id,
                    start_timestamp,
                    response.content,
                    parsed,
                    usage.prompt_tokens,
                    usage.completion_tokens,
                    cached,
                    cost,
                    api_response_time,
                    attempts,
                );
                (outcome, usage.prompt_tokens + usage.completion_tokens, true)
            }
            Err(retry_error) => {
                let outcome = RequestOutcome::failure(
                    id,
                    start_timestamp,
                    retry_error.last_error.message.clone(),
                    ErrorDetails {
                        kind: "RetryError".to_string(),
                        message: retry_error.last_error.message,
                    },
                    api_response_time,
                    attempts,
                );
                (outcome, 0, false)
            }
        };

        self.inner
            .limiter
            .record_request_completion(permit, total_tokens, success);

        self.inner.stats.record_request(
            batch_id,
            RequestRecord {
                model: &self.inner.model,
                success,
                error_type: outcome.error_type(),
                input_tokens: outcome.input_tokens,
                output_tokens: outcome.output_tokens,
                cached_tokens: outcome.cached_tokens,
                api_response_time,
                attempts,
            },
        );
        self.inner.stats.record_concurrent_end(batch_id);

        if let Some(tracker) = tracker {
            if let Some(_milestone) = tracker.increment_and_log() {
                #[cfg(feature = "tracing")]
                tracing::info!(
                    action = "batch_progress",
                    batch_id = batch_id.unwrap_or(""),
                    completed = _milestone.completed,
                    total = _milestone.total,
                    "progress milestone reached"
                );
            }
        }

        outcome
    }
}
