use async_trait::async_trait;
use orc::{
    InferenceClient, InferenceError, InferenceRequest, InferenceResponse, Orchestrator,
    PricingTable, Usage,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct FixedUsageClient {
    prompt_tokens: u64,
    completion_tokens: u64,
    calls: AtomicUsize,
}

#[async_trait]
impl InferenceClient for FixedUsageClient {
    async fn submit(&self, _req: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(InferenceResponse {
            content: "ok".to_string(),
            usage: Usage {
                prompt_tokens: self.prompt_tokens,
                completion_tokens: self.completion_tokens,
                total_tokens: self.prompt_tokens + self.completion_tokens,
                cached_tokens: None,
            },
        })
    }
}

#[tokio::test]
async fn s1_happy_path_small_batch() {
    let pricing = PricingTable::builder()
        .model("gpt-test", 1.0, 2.0, 0.0, false)
        .build();
    let orchestrator = Orchestrator::builder()
        .model("gpt-test")
        .max_tpm(60_000)
        .pricing_table(pricing)
        .client(Arc::new(FixedUsageClient {
            prompt_tokens: 100,
            completion_tokens: 50,
            calls: AtomicUsize::new(0),
        }))
        .build()
        .unwrap();

    let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let batch = orchestrator
        .process_batch(&texts, "{text}", None, Some("s1"), None, &HashMap::new())
        .await
        .unwrap();

    assert_eq!(batch.results.len(), 3);
    assert!(batch.results.iter().all(|r| r.success));
    assert!((batch.batch_stats.total_cost - 0.60).abs() < 1e-9);
    assert!(batch.batch_stats.concurrent_peak <= 3);
}

struct RateLimitOnceClient {
    target_call: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl InferenceClient for RateLimitOnceClient {
    async fn submit(&self, _req: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n == self.target_call {
            Err(InferenceError {
                message: "token rate limit; try again in 2s".to_string(),
                retry_after: None,
            })
        } else {
            Ok(InferenceResponse {
                content: "ok".to_string(),
                usage: Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                    cached_tokens: None,
                },
            })
        }
    }
}

#[tokio::test]
async fn s2_rate_limit_pushback_is_retried_and_notifies_the_limiter() {
    let orchestrator = Orchestrator::builder()
        .model("gpt-test")
        .max_tpm(60_000)
        .initial_concurrency(20)
        .retry_wait(Duration::from_millis(1))
        .client(Arc::new(RateLimitOnceClient {
            target_call: 0,
            calls: AtomicUsize::new(0),
        }))
        .build()
        .unwrap();

    let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let batch = orchestrator
        .process_batch(&texts, "{text}", None, Some("s2"), None, &HashMap::new())
        .await
        .unwrap();

    assert_eq!(batch.results.len(), 3);
    assert!(batch.results.iter().all(|r| r.success));
    // The rate limiter has no batch context, so `ApiRateLimitDetected` only
    // ever reaches the global container (see DESIGN.md's "Batch vs. global
    // stats scope for rate-limiter events").
    assert_eq!(
        orchestrator.get_stats_manager().get_global_stats().api_rate_limit_count,
        1
    );
}

struct AlwaysFailsClient {
    calls: AtomicUsize,
}

#[async_trait]
impl InferenceClient for AlwaysFailsClient {
    async fn submit(&self, _req: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(InferenceError {
            message: "boom".to_string(),
            retry_after: None,
        })
    }
}

#[tokio::test]
async fn s3_terminal_failure_exhausts_retries() {
    let orchestrator = Orchestrator::builder()
        .model("gpt-test")
        .max_tpm(60_000)
        .retry_wait(Duration::from_millis(1))
        .client(Arc::new(AlwaysFailsClient {
            calls: AtomicUsize::new(0),
        }))
        .build()
        .unwrap();

    let texts = vec!["only".to_string()];
    let batch = orchestrator
        .process_batch(&texts, "{text}", None, Some("s3"), None, &HashMap::new())
        .await
        .unwrap();

    assert_eq!(batch.results.len(), 1);
    let outcome = &batch.results[0];
    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.error_type(), Some("RetryError"));
    assert_eq!(batch.batch_stats.failed_requests, 1);
}

struct NeverCalledClient {
    calls: AtomicUsize,
}

#[async_trait]
impl InferenceClient for NeverCalledClient {
    async fn submit(&self, _req: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        unreachable!("schema incompatibility must be rejected before any remote call");
    }
}

#[tokio::test]
async fn s4_json_schema_incompatibility_fails_before_any_call() {
    let pricing = PricingTable::builder()
        .model("gpt-test", 1.0, 2.0, 0.0, false)
        .build();
    let client = Arc::new(NeverCalledClient {
        calls: AtomicUsize::new(0),
    });
    let orchestrator = Orchestrator::builder()
        .model("gpt-test")
        .max_tpm(60_000)
        .pricing_table(pricing)
        .client(Arc::clone(&client) as Arc<dyn InferenceClient>)
        .build()
        .unwrap();

    let schema = orc::ResponseFormat {
        schema_name: "s".to_string(),
        schema: serde_json::json!({"type": "object"}),
    };
    let result = orchestrator
        .process_single("hi", "{text}", Some(schema), None, &HashMap::new())
        .await;

    assert!(result.unwrap_err().is_config());
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}
