//! Parallel fan-out with quorum policy.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use super::breaker::CircuitBreaker;
use super::retry::{with_retry, with_timeout, RetryPolicy};
use crate::cache::QueryCache;
use crate::executors::ModelClient;
use crate::types::config::DispatchConfig;
use crate::types::Response;
use crate::{ConcordError, ConcordResult};

/// How many workers must succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quorum {
    pub min_required: usize,

    /// Return a short result set with a warning instead of failing.
    pub allow_partial: bool,
}

impl Quorum {
    /// Creates a new quorum policy.
    pub fn new(min_required: usize, allow_partial: bool) -> Self {
        Self {
            min_required,
            allow_partial,
        }
    }

    /// Creates a quorum policy from configuration.
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.min_required, config.allow_partial)
    }

    /// Accepts any number of successes, including none.
    pub fn best_effort() -> Self {
        Self::new(1, true)
    }
}

/// Outcome of a fan-out, in input order.
#[derive(Debug, Clone)]
pub struct FanOut<T> {
    pub successes: Vec<T>,

    /// Workers that failed or timed out.
    pub failed: Vec<String>,

    /// One message per failed worker.
    pub errors: Vec<String>,

    /// Workers never called because their circuit was open.
    pub skipped: Vec<String>,
}

impl<T> FanOut<T> {
    fn empty() -> Self {
        Self {
            successes: Vec::new(),
            failed: Vec::new(),
            errors: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Applies the quorum policy.
    pub fn enforce(self, quorum: Quorum) -> ConcordResult<Self> {
        let received = self.successes.len();
        if received >= quorum.min_required {
            return Ok(self);
        }

        if !quorum.allow_partial {
            return Err(ConcordError::InsufficientResponses {
                required: quorum.min_required,
                received,
                errors: self.errors,
            });
        }

        warn!(
            "Only {}/{} required workers succeeded, continuing with partial results",
            received, quorum.min_required
        );
        Ok(self)
    }
}

fn into_worker_error(worker: &str, error: ConcordError) -> ConcordError {
    match error {
        e @ (ConcordError::WorkerTimeout { .. } | ConcordError::WorkerError { .. }) => e,
        other => ConcordError::WorkerError {
            worker: worker.to_string(),
            message: other.to_string(),
        },
    }
}

/// Runs one operation per worker concurrently, without applying a quorum.
///
/// Each worker is bounded by `timeout` independently. Results are put back
/// in `worker_ids` order regardless of completion order.
pub async fn collect_fan_out<T, F, Fut>(
    op_factory: F,
    worker_ids: &[String],
    timeout: Duration,
) -> FanOut<T>
where
    F: Fn(&str) -> Fut,
    Fut: Future<Output = ConcordResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let mut join_set = JoinSet::new();

    for (index, worker) in worker_ids.iter().enumerate() {
        let operation = op_factory(worker);
        let worker = worker.clone();
        join_set.spawn(async move {
            let result = with_timeout(operation, timeout, &worker)
                .await
                .map_err(|e| into_worker_error(&worker, e));
            (index, result)
        });
    }

    let mut slots: Vec<Option<ConcordResult<T>>> = worker_ids.iter().map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => error!("Fan-out task failed to join: {}", e),
        }
    }

    let mut fan_out = FanOut::empty();
    for (worker, slot) in worker_ids.iter().zip(slots) {
        match slot {
            Some(Ok(value)) => fan_out.successes.push(value),
            Some(Err(e)) => {
                warn!(worker = %worker, "Worker failed: {}", e);
                fan_out.failed.push(worker.clone());
                fan_out.errors.push(e.to_string());
            }
            None => {
                fan_out.failed.push(worker.clone());
                fan_out
                    .errors
                    .push(format!("Worker '{}' failed: task aborted", worker));
            }
        }
    }

    fan_out
}

/// Runs one operation per worker concurrently and applies `quorum`.
///
/// # Arguments
///
/// * `op_factory` - Builds the operation for a worker id
/// * `worker_ids` - Workers to run, in result order
/// * `quorum` - Minimum successes and partial-result policy
/// * `timeout` - Per-worker timeout
pub async fn run_fan_out<T, F, Fut>(
    op_factory: F,
    worker_ids: &[String],
    quorum: Quorum,
    timeout: Duration,
) -> ConcordResult<FanOut<T>>
where
    F: Fn(&str) -> Fut,
    Fut: Future<Output = ConcordResult<T>> + Send + 'static,
    T: Send + 'static,
{
    collect_fan_out(op_factory, worker_ids, timeout)
        .await
        .enforce(quorum)
}

/// Queries models through the cache, retry policy and circuit breaker.
pub struct ResilientDispatcher {
    client: Arc<dyn ModelClient>,
    cache: Option<Arc<QueryCache>>,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl ResilientDispatcher {
    /// Creates a dispatcher without a cache.
    pub fn new(
        client: Arc<dyn ModelClient>,
        breaker: Arc<CircuitBreaker>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            cache: None,
            breaker,
            retry,
            timeout,
        }
    }

    /// Creates a dispatcher from configuration.
    pub fn from_config(
        client: Arc<dyn ModelClient>,
        breaker: Arc<CircuitBreaker>,
        config: &DispatchConfig,
    ) -> Self {
        Self::new(
            client,
            breaker,
            RetryPolicy::from_config(config),
            config.timeout_per_model(),
        )
    }

    /// Serves repeated queries from `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Per-model timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the circuit breaker.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Sends `prompt` to every model whose circuit is closed.
    ///
    /// Breaker bookkeeping happens before the quorum check, so failures are
    /// counted even when the call ends in [`ConcordError::InsufficientResponses`].
    pub async fn query_all(
        &self,
        models: &[String],
        prompt: &str,
        json_mode: bool,
        quorum: Quorum,
    ) -> ConcordResult<FanOut<Response>> {
        let (candidates, skipped): (Vec<String>, Vec<String>) =
            models.iter().cloned().partition(|m| !self.breaker.is_open(m));

        if !skipped.is_empty() {
            warn!("Skipping models with open circuits: {:?}", skipped);
        }

        let prompt: Arc<str> = Arc::from(prompt);
        let client = Arc::clone(&self.client);
        let cache = self.cache.clone();
        let retry = self.retry.clone();

        let mut fan_out = collect_fan_out(
            |model: &str| {
                cached_query(
                    Arc::clone(&client),
                    cache.clone(),
                    retry.clone(),
                    model.to_string(),
                    Arc::clone(&prompt),
                    json_mode,
                )
            },
            &candidates,
            self.timeout,
        )
        .await;

        for response in &fan_out.successes {
            self.breaker.record_success(&response.model_id);
        }
        for model in &fan_out.failed {
            self.breaker.record_failure(model);
        }

        fan_out.skipped = skipped;
        fan_out.enforce(quorum)
    }

    /// Sends `prompt` to a single model.
    pub async fn query_one(
        &self,
        model: &str,
        prompt: &str,
        json_mode: bool,
    ) -> ConcordResult<Response> {
        if self.breaker.is_open(model) {
            return Err(ConcordError::WorkerError {
                worker: model.to_string(),
                message: "circuit open".to_string(),
            });
        }

        let call = cached_query(
            Arc::clone(&self.client),
            self.cache.clone(),
            self.retry.clone(),
            model.to_string(),
            Arc::from(prompt),
            json_mode,
        );

        match with_timeout(call, self.timeout, model).await {
            Ok(response) => {
                self.breaker.record_success(model);
                Ok(response)
            }
            Err(e) => {
                self.breaker.record_failure(model);
                Err(into_worker_error(model, e))
            }
        }
    }
}

async fn cached_query(
    client: Arc<dyn ModelClient>,
    cache: Option<Arc<QueryCache>>,
    retry: RetryPolicy,
    model: String,
    prompt: Arc<str>,
    json_mode: bool,
) -> ConcordResult<Response> {
    if let Some(cache) = &cache {
        if let Some(content) = cache.get(&model, &prompt) {
            debug!(model = %model, "Cache hit");
            return Ok(Response::new(model, content));
        }
    }

    let reply = with_retry(&retry, || client.query(&model, &prompt, json_mode)).await?;

    if let Some(cache) = &cache {
        cache.set(&model, &prompt, reply.content.clone());
    }

    Ok(Response::from_reply(model, reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModelReply;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingClient {
        calls: AtomicU32,
        fail_for: Vec<String>,
    }

    impl CountingClient {
        fn new(fail_for: &[&str]) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_for: fail_for.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl ModelClient for CountingClient {
        fn name(&self) -> &str {
            "counting"
        }

        async fn query(&self, model: &str, prompt: &str, _json: bool) -> ConcordResult<ModelReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_for.iter().any(|m| m == model) {
                return Err(ConcordError::ModelQuery(model.to_string(), "boom".into()));
            }
            Ok(ModelReply::new(format!("{} says {}", model, prompt)))
        }
    }

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn dispatcher(client: Arc<CountingClient>) -> ResilientDispatcher {
        ResilientDispatcher::new(
            client,
            Arc::new(CircuitBreaker::new(2, Duration::from_secs(60))),
            RetryPolicy::none(),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_fan_out_preserves_input_order() {
        let workers = models(&["slow", "fast", "medium"]);

        let result = run_fan_out(
            |worker: &str| {
                let worker = worker.to_string();
                async move {
                    let delay = match worker.as_str() {
                        "slow" => 60,
                        "medium" => 30,
                        _ => 0,
                    };
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    Ok(worker)
                }
            },
            &workers,
            Quorum::new(3, false),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert_eq!(result.successes, workers);
        assert!(result.failed.is_empty());
    }

    #[tokio::test]
    async fn test_worker_errors_are_wrapped() {
        let workers = models(&["ok", "bad"]);

        let result = run_fan_out(
            |worker: &str| {
                let worker = worker.to_string();
                async move {
                    if worker == "bad" {
                        Err(ConcordError::other("exploded"))
                    } else {
                        Ok(())
                    }
                }
            },
            &workers,
            Quorum::new(1, false),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert_eq!(result.successes.len(), 1);
        assert_eq!(result.failed, vec!["bad"]);
        assert_eq!(result.errors, vec!["Worker 'bad' failed: exploded"]);
    }

    #[tokio::test]
    async fn test_query_all_uses_cache() {
        let client = Arc::new(CountingClient::new(&[]));
        let dispatcher = dispatcher(Arc::clone(&client))
            .with_cache(Arc::new(QueryCache::new(10, Duration::from_secs(60))));
        let council = models(&["a", "b"]);

        let first = dispatcher
            .query_all(&council, "hi", false, Quorum::new(2, false))
            .await
            .unwrap();
        let second = dispatcher
            .query_all(&council, "hi", false, Quorum::new(2, false))
            .await
            .unwrap();

        assert_eq!(first.successes, second.successes);
        assert_eq!(second.successes[0].content, "a says hi");
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_query_all_opens_circuit_and_skips() {
        let client = Arc::new(CountingClient::new(&["flaky"]));
        let dispatcher = dispatcher(Arc::clone(&client));
        let council = models(&["flaky", "steady"]);

        for _ in 0..2 {
            let result = dispatcher
                .query_all(&council, "q", false, Quorum::best_effort())
                .await
                .unwrap();
            assert_eq!(result.failed, vec!["flaky"]);
        }

        let result = dispatcher
            .query_all(&council, "q", false, Quorum::best_effort())
            .await
            .unwrap();
        assert!(result.failed.is_empty());
        assert_eq!(result.skipped, vec!["flaky"]);
        assert_eq!(result.successes.len(), 1);
        assert_eq!(client.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_query_one_reports_failures() {
        let client = Arc::new(CountingClient::new(&["down"]));
        let dispatcher = dispatcher(client);

        let ok = dispatcher.query_one("up", "q", false).await.unwrap();
        assert_eq!(ok.model_id, "up");

        let err = dispatcher.query_one("down", "q", false).await.unwrap_err();
        assert!(matches!(err, ConcordError::WorkerError { .. }));
        assert_eq!(dispatcher.breaker().failure_count("down"), 1);
    }

    #[test]
    fn test_enforce_quorum() {
        let mut fan_out: FanOut<u8> = FanOut::empty();
        fan_out.successes.push(1);
        fan_out.failed.push("w2".into());
        fan_out.errors.push("w2 down".into());

        let partial = fan_out.clone().enforce(Quorum::new(2, true)).unwrap();
        assert_eq!(partial.successes, vec![1]);

        match fan_out.enforce(Quorum::new(2, false)) {
            Err(ConcordError::InsufficientResponses {
                required,
                received,
                errors,
            }) => {
                assert_eq!(required, 2);
                assert_eq!(received, 1);
                assert_eq!(errors, vec!["w2 down"]);
            }
            other => panic!("unexpected: {:?}", other.map(|f| f.successes)),
        }
    }
}
