//! The composed outbound pipeline.

use crate::config::ResilienceConfig;
use outbound_resilience_bulkhead::{ConcurrencyLimiter, Permit};
use outbound_resilience_cache::Cache;
use outbound_resilience_circuitbreaker::CircuitBreaker;
use outbound_resilience_coalesce::RequestDeduplicator;
use outbound_resilience_core::{ConfigError, RequestContext, ResilienceError};
use outbound_resilience_guard::{GuardedClient, HttpError, Lookup};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// Resilient access to one upstream.
///
/// Every call goes through, in order: the concurrency limiter, the circuit
/// breaker, single-flight deduplication by key, the cache, and finally the
/// fetch function bounded by the request timeout. Outcomes feed back into the
/// breaker and successful values into the cache. Nothing is retried.
///
/// `V` is the cached value type and `E` the upstream error type. Both are
/// cloned to every caller that shares an execution. Cloning the client is
/// cheap; clones share every component.
pub struct ResilientClient<V, E> {
    cache: Cache<String, V>,
    breaker: CircuitBreaker,
    dedup: RequestDeduplicator<String, V, ResilienceError<E>>,
    limiter: ConcurrencyLimiter,
    http: GuardedClient,
    request_timeout: Duration,
}

impl<V, E> Clone for ResilientClient<V, E> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            breaker: self.breaker.clone(),
            dedup: self.dedup.clone(),
            limiter: self.limiter.clone(),
            http: self.http.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

impl<V, E> ResilientClient<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + 'static,
{
    /// Builds every component. Call from within a tokio runtime to get the
    /// background cache sweep.
    pub fn new(config: ResilienceConfig) -> Result<Self, ConfigError> {
        let http = GuardedClient::new(&config.guard)?;
        Self::with_http(config, http)
    }

    /// Like [`new`](Self::new), resolving names through `lookup`.
    pub fn with_lookup(
        config: ResilienceConfig,
        lookup: Arc<dyn Lookup>,
    ) -> Result<Self, ConfigError> {
        let http = GuardedClient::with_lookup(&config.guard, lookup)?;
        Self::with_http(config, http)
    }

    fn with_http(config: ResilienceConfig, http: GuardedClient) -> Result<Self, ConfigError> {
        config.validate()?;
        let dedup = RequestDeduplicator::new(config.circuit_breaker.name.clone());
        let request_timeout = config.guard.request_timeout;
        Ok(Self {
            cache: Cache::new(config.cache)?,
            breaker: CircuitBreaker::new(config.circuit_breaker)?,
            dedup,
            limiter: ConcurrencyLimiter::new(config.limiter)?,
            http,
            request_timeout,
        })
    }

    /// Runs `fetch` for `key` through the whole pipeline.
    ///
    /// `fetch` is only invoked if this caller ends up executing the request:
    /// callers that find the value cached, or that join an execution already
    /// in flight for `key`, never call it. The execution itself is detached
    /// from the caller, so cancelling `ctx` returns promptly with
    /// [`ResilienceError::Canceled`] while the shared result is still
    /// delivered to the other callers and cached. The executing caller's
    /// limiter permit moves into the execution and is held until the fetch
    /// settles.
    pub async fn run<F, Fut>(
        &self,
        key: impl Into<String>,
        ctx: &RequestContext,
        fetch: F,
    ) -> Result<V, ResilienceError<E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, ResilienceError<E>>> + Send + 'static,
    {
        let key = key.into();
        // the leader hands its permit to the execution, which may outlive it
        let mut permit = Some(self.limiter.acquire(ctx).await?);

        if let Err(err) = self.breaker.try_acquire() {
            #[cfg(feature = "tracing")]
            warn!(breaker = %err.name, key = %key, retry_after = ?err.retry_after, "call rejected");
            return Err(err.into());
        }

        if let Some(value) = self.cache.get(&key) {
            self.breaker.release_probe();
            #[cfg(feature = "tracing")]
            debug!(key = %key, "served from cache");
            return Ok(value);
        }

        let mut executed = false;
        let execution = Execution {
            cache: self.cache.clone(),
            breaker: self.breaker.clone(),
            key: key.clone(),
            timeout: self.request_timeout,
        };
        let result = self
            .dedup
            .run(ctx, key, || {
                executed = true;
                execution.run(permit.take(), fetch)
            })
            .await;
        drop(permit);

        // callers that joined another execution did not reach the upstream
        if !executed {
            self.breaker.release_probe();
        }

        match result {
            Ok(shared) => Ok(shared.into_value()),
            Err(err) => Err(err.into()),
        }
    }

    /// [`run`](Self::run) with the guarded transport handed to the fetch
    /// function.
    ///
    /// ```rust,no_run
    /// use outbound_resilience::{ResilienceConfig, ResilientClient};
    /// use outbound_resilience_core::{RequestContext, ResilienceError};
    /// use outbound_resilience_guard::HttpError;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client: ResilientClient<String, HttpError> = ResilientClient::new(ResilienceConfig::default())?;
    /// let ctx = RequestContext::new();
    ///
    /// let body = client
    ///     .execute("company/123", &ctx, |http| async move {
    ///         http.get_text("https://registry.example.com/company/123")
    ///             .await
    ///             .map_err(ResilienceError::from)
    ///     })
    ///     .await?;
    /// # let _ = body;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn execute<F, Fut>(
        &self,
        key: impl Into<String>,
        ctx: &RequestContext,
        fetch: F,
    ) -> Result<V, ResilienceError<E>>
    where
        F: FnOnce(GuardedClient) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, ResilienceError<E>>> + Send + 'static,
    {
        let http = self.http.clone();
        self.run(key, ctx, move || fetch(http)).await
    }

    pub fn cache(&self) -> &Cache<String, V> {
        &self.cache
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    pub fn deduplicator(&self) -> &RequestDeduplicator<String, V, ResilienceError<E>> {
        &self.dedup
    }

    /// The guarded transport.
    pub fn http(&self) -> &GuardedClient {
        &self.http
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Stops the cache sweep, drops cached values and refuses new permits.
    /// Calls already holding a permit finish normally.
    pub fn close(&self) {
        self.cache.close();
        self.limiter.close();
        #[cfg(feature = "tracing")]
        debug!(breaker = %self.breaker.name(), "resilient client closed");
    }
}

impl<V> ResilientClient<V, HttpError>
where
    V: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// GETs `url` and decodes its JSON body, keyed by the URL.
    pub async fn get_json(
        &self,
        ctx: &RequestContext,
        url: &str,
    ) -> Result<V, ResilienceError<HttpError>> {
        let target = url.to_owned();
        self.execute(url, ctx, move |http| async move {
            http.get_json::<V>(&target).await.map_err(ResilienceError::from)
        })
        .await
    }
}

impl<V, E> std::fmt::Debug for ResilientClient<V, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientClient")
            .field("breaker", &self.breaker)
            .field("limiter", &self.limiter)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// The detached part of a call: runs once per key at a time, on its own task.
struct Execution<V> {
    cache: Cache<String, V>,
    breaker: CircuitBreaker,
    key: String,
    timeout: Duration,
}

impl<V> Execution<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Holds `permit` until the fetch settles, even if every caller has
    /// stopped waiting.
    async fn run<E, F, Fut>(self, permit: Option<Permit>, fetch: F) -> Result<V, ResilienceError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ResilienceError<E>>>,
    {
        let _permit = permit;

        // another execution may have filled the cache since the caller looked
        if let Some(value) = self.cache.get(&self.key) {
            self.breaker.release_probe();
            return Ok(value);
        }

        let mut outcome = Outcome {
            breaker: &self.breaker,
            settled: false,
        };
        let result = match tokio::time::timeout(self.timeout, fetch()).await {
            Ok(result) => result,
            Err(_) => Err(ResilienceError::Timeout { layer: "request" }),
        };

        match &result {
            Ok(value) => {
                outcome.success();
                self.cache.insert(self.key.clone(), value.clone());
            }
            Err(err) if err.counts_as_failure() => {
                #[cfg(feature = "tracing")]
                debug!(key = %self.key, timeout = err.is_timeout(), "upstream call failed");
                outcome.failure();
            }
            Err(_err) => {
                #[cfg(feature = "tracing")]
                debug!(key = %self.key, guard_reason = ?_err.guard_reason(), "call ended locally");
                outcome.release();
            }
        }
        result
    }
}

/// Reports exactly one outcome to the breaker. Dropped unsettled (the fetch
/// panicked) counts as a failure.
struct Outcome<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl Outcome<'_> {
    fn success(&mut self) {
        self.settled = true;
        self.breaker.record_success();
    }

    fn failure(&mut self) {
        self.settled = true;
        self.breaker.record_failure();
    }

    fn release(&mut self) {
        self.settled = true;
        self.breaker.release_probe();
    }
}

impl Drop for Outcome<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.record_failure();
        }
    }
}
