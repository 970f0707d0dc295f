use crate::config::LimiterConfig;
use crate::error::LimiterError;
use crate::events::LimiterEvent;
use outbound_resilience_core::{ConfigError, RequestContext};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, gauge};

#[cfg(feature = "tracing")]
use tracing::debug;

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

struct Inner {
    config: LimiterConfig,
    semaphore: Arc<Semaphore>,
}

impl Inner {
    fn in_use(&self) -> usize {
        self.config
            .max_concurrent
            .saturating_sub(self.semaphore.available_permits())
    }

    fn reject(&self, error: LimiterError) -> LimiterError {
        #[cfg(feature = "metrics")]
        counter!("bulkhead_calls_rejected_total", "bulkhead" => self.config.name.clone())
            .increment(1);

        #[cfg(feature = "tracing")]
        debug!(limiter = %self.config.name, %error, "permit not acquired");

        self.config
            .event_listeners
            .emit(&LimiterEvent::CallRejected {
                pattern_name: self.config.name.clone(),
                timestamp: std::time::Instant::now(),
                error,
            });
        error
    }
}

/// Bounds the number of concurrent upstream calls.
///
/// Cloning is cheap; clones share the same slots.
#[derive(Clone)]
pub struct ConcurrencyLimiter {
    inner: Arc<Inner>,
}

impl ConcurrencyLimiter {
    /// Creates a limiter from a validated configuration.
    pub fn new(config: LimiterConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "bulkhead_calls_permitted_total",
                "Total number of calls permitted by the limiter"
            );
            describe_counter!(
                "bulkhead_calls_rejected_total",
                "Total number of acquire calls that gave up (cancelled, timed out, closed)"
            );
            describe_gauge!(
                "bulkhead_concurrent_calls",
                "Number of permits currently held"
            );
        });

        let semaphore = Arc::new(Semaphore::new(config.max_concurrent));
        Ok(Self {
            inner: Arc::new(Inner { config, semaphore }),
        })
    }

    /// Waits for a free slot.
    ///
    /// Returns immediately with [`LimiterError::Canceled`] if `ctx` is already
    /// done, and as soon as it becomes done while waiting. With `max_wait`
    /// configured, gives up with [`LimiterError::Timeout`]. A call that
    /// returns an error holds no slot.
    pub async fn acquire(&self, ctx: &RequestContext) -> Result<Permit, LimiterError> {
        let semaphore = Arc::clone(&self.inner.semaphore);

        let acquired = match self.inner.config.max_wait {
            Some(max_wait) => {
                tokio::select! {
                    biased;
                    cause = ctx.done() => Err(LimiterError::Canceled(cause)),
                    res = tokio::time::timeout(max_wait, semaphore.acquire_owned()) => match res {
                        Ok(Ok(permit)) => Ok(permit),
                        Ok(Err(_)) => Err(LimiterError::Closed),
                        Err(_) => Err(LimiterError::Timeout { max_wait }),
                    },
                }
            }
            None => {
                tokio::select! {
                    biased;
                    cause = ctx.done() => Err(LimiterError::Canceled(cause)),
                    res = semaphore.acquire_owned() => res.map_err(|_| LimiterError::Closed),
                }
            }
        };

        let permit = acquired.map_err(|err| self.inner.reject(err))?;
        let concurrent_calls = self.inner.in_use();

        #[cfg(feature = "metrics")]
        {
            counter!("bulkhead_calls_permitted_total", "bulkhead" => self.inner.config.name.clone())
                .increment(1);
            gauge!("bulkhead_concurrent_calls", "bulkhead" => self.inner.config.name.clone())
                .set(concurrent_calls as f64);
        }

        self.inner
            .config
            .event_listeners
            .emit(&LimiterEvent::CallPermitted {
                pattern_name: self.inner.config.name.clone(),
                timestamp: std::time::Instant::now(),
                concurrent_calls,
            });

        Ok(Permit {
            permit: Some(permit),
            inner: Arc::clone(&self.inner),
        })
    }

    /// Takes a slot only if one is free right now.
    pub fn try_acquire(&self) -> Option<Permit> {
        let permit = Arc::clone(&self.inner.semaphore).try_acquire_owned().ok()?;
        Some(Permit {
            permit: Some(permit),
            inner: Arc::clone(&self.inner),
        })
    }

    /// Free slots.
    pub fn available(&self) -> usize {
        self.inner.semaphore.available_permits()
    }

    /// Configured slot count.
    pub fn max_concurrent(&self) -> usize {
        self.inner.config.max_concurrent
    }

    /// Slots currently held.
    pub fn in_use(&self) -> usize {
        self.inner.in_use()
    }

    /// Wakes every waiter with [`LimiterError::Closed`] and refuses new
    /// acquisitions. Held permits stay valid until dropped.
    pub fn close(&self) {
        self.inner.semaphore.close();
    }

    /// The instance name.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }
}

impl std::fmt::Debug for ConcurrencyLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrencyLimiter")
            .field("name", &self.inner.config.name)
            .field("max_concurrent", &self.inner.config.max_concurrent)
            .field("available", &self.available())
            .finish()
    }
}

/// One held slot. The slot is released when the permit is dropped, so an
/// early return, an error or a panic cannot leak capacity.
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct Permit {
    permit: Option<OwnedSemaphorePermit>,
    inner: Arc<Inner>,
}

impl Permit {
    /// Releases the slot now. Equivalent to dropping the permit.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if let Some(permit) = self.permit.take() {
            drop(permit);

            #[cfg(feature = "metrics")]
            gauge!("bulkhead_concurrent_calls", "bulkhead" => self.inner.config.name.clone())
                .set(self.inner.in_use() as f64);

            if !self.inner.config.event_listeners.is_empty() {
                self.inner
                    .config
                    .event_listeners
                    .emit(&LimiterEvent::PermitReleased {
                        pattern_name: self.inner.config.name.clone(),
                        timestamp: std::time::Instant::now(),
                    });
            }
        }
    }
}

impl std::fmt::Debug for Permit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Permit")
            .field("limiter", &self.inner.config.name)
            .finish()
    }
}
