//! Bounded concurrent dispatch of description requests.
//!
//! One tokio task per image, gated by a semaphore, with per-request timeout
//! and retry. Results are collected by index so the returned batch aligns
//! one-to-one with the submitted batch — the caller maps slot `i` straight
//! back onto the picture it came from.

use super::model::{DescribeRequest, Description, VisionModel};
use super::retry;
use crate::config::Config;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Dispatch settings for a description batch.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum concurrent model calls
    pub max_workers: usize,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Maximum retries per image
    pub retry_attempts: u32,
    /// Base backoff delay in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_workers: 3,
            timeout_ms: 30_000,
            retry_attempts: 2,
            retry_delay_ms: 500,
        }
    }
}

impl BatchOptions {
    /// Derive dispatch settings from the crate configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_workers: config.batch.max_workers,
            timeout_ms: config.timeout_ms(),
            retry_attempts: config.batch.retry_attempts,
            retry_delay_ms: config.batch.retry_delay_ms,
        }
    }
}

/// Result of describing a single image.
#[derive(Debug)]
pub enum DescribeOutcome {
    Described(Description),
    Failed(String),
}

/// Concurrent batch description engine.
pub struct Describer {
    model: Arc<dyn VisionModel>,
    options: BatchOptions,
}

impl Describer {
    pub fn new(model: Arc<dyn VisionModel>, options: BatchOptions) -> Self {
        Self { model, options }
    }

    /// The backend this describer dispatches to.
    pub fn model(&self) -> &Arc<dyn VisionModel> {
        &self.model
    }

    /// Describe a batch of images.
    ///
    /// Spawns one tokio task per request, bounded by a semaphore of
    /// `max_workers` permits. The returned vec has exactly one outcome per
    /// request, in input order; a failure in one slot never shifts another
    /// slot's result.
    pub async fn describe_batch(&self, requests: Vec<DescribeRequest>) -> Vec<DescribeOutcome> {
        let total = requests.len();
        let semaphore = Arc::new(Semaphore::new(self.options.max_workers));
        let mut handles = Vec::with_capacity(total);

        for (index, request) in requests.into_iter().enumerate() {
            let permit = semaphore.clone().acquire_owned().await;
            let Ok(permit) = permit else {
                tracing::warn!("Dispatch semaphore closed unexpectedly — stopping batch");
                break;
            };

            let model = self.model.clone();
            let options = self.options.clone();

            let handle = tokio::spawn(async move {
                let outcome = describe_single(&model, &request, &options).await;
                drop(permit);
                outcome
            });

            handles.push((index, handle));
        }

        let mut outcomes: Vec<Option<DescribeOutcome>> = Vec::with_capacity(total);
        outcomes.resize_with(total, || None);

        for (index, handle) in handles {
            outcomes[index] = Some(match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Description task panicked: {e}");
                    DescribeOutcome::Failed(format!("Task panicked: {e}"))
                }
            });
        }

        outcomes
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| DescribeOutcome::Failed("Not submitted".to_string())))
            .collect()
    }
}

/// Describe a single image with timeout and retry.
async fn describe_single(
    model: &Arc<dyn VisionModel>,
    request: &DescribeRequest,
    options: &BatchOptions,
) -> DescribeOutcome {
    let mut last_error = String::new();

    for attempt in 0..=options.retry_attempts {
        if attempt > 0 {
            let delay = retry::backoff_duration(attempt - 1, options.retry_delay_ms);
            tracing::debug!(
                "Retry {attempt}/{} via {} after {delay:?}",
                options.retry_attempts,
                model.name()
            );
            tokio::time::sleep(delay).await;
        }

        match tokio::time::timeout(
            std::time::Duration::from_millis(options.timeout_ms),
            model.describe(request),
        )
        .await
        {
            Ok(Ok(description)) => return DescribeOutcome::Described(description),
            Ok(Err(e)) => {
                let retryable = retry::is_retryable(&e);
                last_error = e.to_string();
                if !retryable {
                    break;
                }
            }
            Err(_) => {
                last_error = format!("Timed out after {}ms", options.timeout_ms);
                // Timeouts are retryable
            }
        }
    }

    DescribeOutcome::Failed(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InferenceConfig;
    use crate::describe::model::ImagePayload;
    use crate::error::DescribeError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// A configurable mock vision model for testing dispatch behavior.
    ///
    /// Each call to `describe()` invokes the response factory with the
    /// current call index, allowing different results per attempt.
    struct MockModel {
        /// Factory producing a response for each call index.
        response_fn: Box<dyn Fn(u32, &DescribeRequest) -> Result<Description, DescribeError> + Send + Sync>,
        /// Tracks how many times `describe` was called.
        call_count: Arc<AtomicU32>,
        /// Optional delay before returning.
        delay: Option<Duration>,
        /// Tracks concurrent in-flight calls (for semaphore testing).
        in_flight: Option<(Arc<AtomicU32>, Arc<AtomicU32>)>, // (in_flight, max_concurrent)
    }

    impl MockModel {
        /// Echo the request prompt back as the description text.
        fn echo() -> Self {
            Self {
                response_fn: Box::new(|_, request| {
                    Ok(Description {
                        text: request.prompt.clone(),
                        model: "mock-v1".to_string(),
                        tokens_used: Some(42),
                        latency_ms: 10,
                    })
                }),
                call_count: Arc::new(AtomicU32::new(0)),
                delay: None,
                in_flight: None,
            }
        }

        fn failing(code: Option<&str>, message: &str) -> Self {
            let code = code.map(String::from);
            let message = message.to_string();
            Self {
                response_fn: Box::new(move |_, _| {
                    Err(DescribeError::Api {
                        message: message.clone(),
                        code: code.clone(),
                    })
                }),
                call_count: Arc::new(AtomicU32::new(0)),
                delay: None,
                in_flight: None,
            }
        }

        /// First call returns an error, subsequent calls succeed.
        fn fail_then_succeed(code: Option<&str>, error_msg: &str, success_text: &str) -> Self {
            let code = code.map(String::from);
            let error_msg = error_msg.to_string();
            let success_text = success_text.to_string();
            Self {
                response_fn: Box::new(move |idx, _| {
                    if idx == 0 {
                        Err(DescribeError::Api {
                            message: error_msg.clone(),
                            code: code.clone(),
                        })
                    } else {
                        Ok(Description {
                            text: success_text.clone(),
                            model: "mock-v1".to_string(),
                            tokens_used: Some(20),
                            latency_ms: 50,
                        })
                    }
                }),
                call_count: Arc::new(AtomicU32::new(0)),
                delay: None,
                in_flight: None,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Shared handle to the call counter (clone before moving the model).
        fn call_count_handle(&self) -> Arc<AtomicU32> {
            self.call_count.clone()
        }
    }

    #[async_trait]
    impl VisionModel for MockModel {
        fn name(&self) -> &str {
            "mock"
        }

        fn provenance(&self) -> &str {
            "mock-provenance"
        }

        async fn describe(&self, request: &DescribeRequest) -> Result<Description, DescribeError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Some((ref in_flight, ref max_concurrent)) = self.in_flight {
                let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_concurrent.fetch_max(current, Ordering::SeqCst);
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let result = (self.response_fn)(idx, request);
            if let Some((ref in_flight, _)) = self.in_flight {
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
            result
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(30)
        }
    }

    fn request_with_prompt(prompt: &str) -> DescribeRequest {
        let payload = ImagePayload::from_bytes(&[1, 2, 3], "image/png").unwrap();
        let mut request = DescribeRequest::new(payload, &InferenceConfig::default());
        request.prompt = prompt.to_string();
        request
    }

    fn fast_options() -> BatchOptions {
        BatchOptions {
            max_workers: 4,
            timeout_ms: 5000,
            retry_attempts: 0,
            retry_delay_ms: 10,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_batch_basic_success() {
        let describer = Describer::new(Arc::new(MockModel::echo()), fast_options());
        let outcomes = describer
            .describe_batch(vec![request_with_prompt("a beach")])
            .await;

        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            DescribeOutcome::Described(d) => {
                assert_eq!(d.text, "a beach");
                assert_eq!(d.model, "mock-v1");
            }
            DescribeOutcome::Failed(msg) => panic!("Expected success, got: {msg}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_batch_results_align_with_input_order() {
        // Varying delays would reorder completion; slots must not move.
        let model = MockModel::echo().with_delay(Duration::from_millis(20));
        let describer = Describer::new(Arc::new(model), fast_options());

        let requests: Vec<_> = (0..8).map(|i| request_with_prompt(&format!("image-{i}"))).collect();
        let outcomes = describer.describe_batch(requests).await;

        assert_eq!(outcomes.len(), 8);
        for (i, outcome) in outcomes.iter().enumerate() {
            match outcome {
                DescribeOutcome::Described(d) => assert_eq!(d.text, format!("image-{i}")),
                DescribeOutcome::Failed(msg) => panic!("Slot {i} failed: {msg}"),
            }
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_batch_retries_on_throttling() {
        let model =
            MockModel::fail_then_succeed(Some("ThrottlingException"), "throttled", "Recovered.");
        let call_count = model.call_count_handle();
        let options = BatchOptions {
            retry_attempts: 1,
            retry_delay_ms: 10,
            ..fast_options()
        };
        let describer = Describer::new(Arc::new(model), options);
        let outcomes = describer.describe_batch(vec![request_with_prompt("p")]).await;

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
        match &outcomes[0] {
            DescribeOutcome::Described(d) => assert_eq!(d.text, "Recovered."),
            DescribeOutcome::Failed(msg) => panic!("Expected recovery, got: {msg}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_batch_no_retry_on_access_denied() {
        let model = MockModel::failing(Some("AccessDeniedException"), "not authorized");
        let call_count = model.call_count_handle();
        let options = BatchOptions {
            retry_attempts: 3,
            retry_delay_ms: 10,
            ..fast_options()
        };
        let describer = Describer::new(Arc::new(model), options);
        let outcomes = describer.describe_batch(vec![request_with_prompt("p")]).await;

        // Exactly one call: auth errors are not retried
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        match &outcomes[0] {
            DescribeOutcome::Failed(msg) => assert!(msg.contains("not authorized")),
            DescribeOutcome::Described(_) => panic!("Expected auth failure"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_batch_exhausts_retries() {
        let model = MockModel::failing(Some("ThrottlingException"), "throttled");
        let call_count = model.call_count_handle();
        let options = BatchOptions {
            retry_attempts: 2,
            retry_delay_ms: 10,
            ..fast_options()
        };
        let describer = Describer::new(Arc::new(model), options);
        let outcomes = describer.describe_batch(vec![request_with_prompt("p")]).await;

        // 1 initial + 2 retries = 3 total calls
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        assert!(matches!(&outcomes[0], DescribeOutcome::Failed(msg) if msg.contains("throttled")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_batch_timeout() {
        let model = MockModel::echo().with_delay(Duration::from_secs(5));
        let options = BatchOptions {
            timeout_ms: 50,
            retry_attempts: 0,
            ..fast_options()
        };
        let describer = Describer::new(Arc::new(model), options);
        let outcomes = describer.describe_batch(vec![request_with_prompt("p")]).await;

        match &outcomes[0] {
            DescribeOutcome::Failed(msg) => assert!(msg.contains("Timed out"), "Got: {msg}"),
            DescribeOutcome::Described(_) => panic!("Expected timeout failure"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_batch_semaphore_bounds_concurrency() {
        let in_flight = Arc::new(AtomicU32::new(0));
        let max_concurrent = Arc::new(AtomicU32::new(0));

        let model = MockModel {
            response_fn: Box::new(|_, _| {
                Ok(Description {
                    text: "described".to_string(),
                    model: "mock-v1".to_string(),
                    tokens_used: Some(10),
                    latency_ms: 5,
                })
            }),
            call_count: Arc::new(AtomicU32::new(0)),
            delay: Some(Duration::from_millis(200)),
            in_flight: Some((in_flight.clone(), max_concurrent.clone())),
        };

        // 6 requests, max_workers=2 → at most 2 concurrent calls
        let options = BatchOptions {
            max_workers: 2,
            timeout_ms: 5000,
            retry_attempts: 0,
            retry_delay_ms: 10,
        };
        let describer = Describer::new(Arc::new(model), options);
        let requests: Vec<_> = (0..6).map(|i| request_with_prompt(&format!("p{i}"))).collect();
        let outcomes = describer.describe_batch(requests).await;

        assert_eq!(outcomes.len(), 6);
        assert!(outcomes.iter().all(|o| matches!(o, DescribeOutcome::Described(_))));
        assert!(
            max_concurrent.load(Ordering::SeqCst) <= 2,
            "semaphore violated: max concurrent was {}",
            max_concurrent.load(Ordering::SeqCst)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_batch_empty() {
        let model = MockModel::echo();
        let call_count = model.call_count_handle();
        let describer = Describer::new(Arc::new(model), fast_options());
        let outcomes = describer.describe_batch(vec![]).await;

        assert!(outcomes.is_empty());
        assert_eq!(call_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_batch_options_from_config() {
        let config = Config::default();
        let options = BatchOptions::from_config(&config);
        assert_eq!(options.max_workers, 3);
        assert_eq!(options.timeout_ms, 30_000);
        assert_eq!(options.retry_attempts, 2);
        assert_eq!(options.retry_delay_ms, 500);
    }
}
