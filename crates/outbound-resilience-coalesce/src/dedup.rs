//! Single-flight execution keyed by request identity.

use crate::error::CoalesceError;
use hashbrown::HashMap;
use outbound_resilience_core::RequestContext;
use parking_lot::Mutex;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::broadcast;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, gauge};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

/// A value produced by a shared execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shared<V> {
    /// The fetch result, cloned for every caller.
    pub value: V,
    /// True for the caller whose call started the execution.
    pub was_leader: bool,
}

impl<V> Shared<V> {
    pub fn into_value(self) -> V {
        self.value
    }
}

type Outcome<V, E> = Result<V, E>;

struct InFlight<K, V, E> {
    name: String,
    requests: Mutex<HashMap<K, broadcast::Sender<Outcome<V, E>>>>,
}

impl<K, V, E> InFlight<K, V, E>
where
    K: Hash + Eq,
{
    /// Removes the entry and publishes the result under the same lock, so a
    /// caller arriving afterwards starts a fresh execution and never sees a
    /// stale result.
    fn complete(&self, key: &K, outcome: Outcome<V, E>) {
        let mut requests = self.requests.lock();
        if let Some(sender) = requests.remove(key) {
            // no receivers left is fine
            let _ = sender.send(outcome);
        }
        #[cfg(feature = "metrics")]
        gauge!("coalesce_in_flight", "coalesce" => self.name.clone()).set(requests.len() as f64);
    }

    /// Removes the entry without a result; waiters see the channel close.
    fn abort(&self, key: &K) {
        let mut requests = self.requests.lock();
        requests.remove(key);
        #[cfg(feature = "metrics")]
        gauge!("coalesce_in_flight", "coalesce" => self.name.clone()).set(requests.len() as f64);
    }
}

/// Publishes the outcome of the spawned execution, or aborts the entry if the
/// execution unwinds before completing.
struct Completion<K, V, E>
where
    K: Hash + Eq,
{
    in_flight: Arc<InFlight<K, V, E>>,
    key: Option<K>,
}

impl<K, V, E> Completion<K, V, E>
where
    K: Hash + Eq,
{
    fn finish(mut self, outcome: Outcome<V, E>) {
        if let Some(key) = self.key.take() {
            self.in_flight.complete(&key, outcome);
        }
    }
}

impl<K, V, E> Drop for Completion<K, V, E>
where
    K: Hash + Eq,
{
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            #[cfg(feature = "tracing")]
            warn!(coalesce = %self.in_flight.name, "shared execution aborted");
            self.in_flight.abort(&key);
        }
    }
}

/// Collapses concurrent calls with the same key into one execution.
///
/// Cloning is cheap; clones share the in-flight table.
pub struct RequestDeduplicator<K, V, E> {
    in_flight: Arc<InFlight<K, V, E>>,
}

impl<K, V, E> Clone for RequestDeduplicator<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<K, V, E> Default for RequestDeduplicator<K, V, E>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new("coalesce")
    }
}

impl<K, V, E> RequestDeduplicator<K, V, E>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Creates an empty deduplicator. `name` labels logs and metrics.
    pub fn new(name: impl Into<String>) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "coalesce_requests_total",
                "Total number of requests processed by the deduplicator"
            );
            describe_gauge!("coalesce_in_flight", "Keys with an execution in flight");
        });

        Self {
            in_flight: Arc::new(InFlight {
                name: name.into(),
                requests: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Runs `fetch` for `key`, or joins the execution already in flight for
    /// it.
    ///
    /// The first caller for a key becomes the leader and its `fetch` is
    /// spawned as an independent task; later callers with the same key wait
    /// for that task and receive a clone of its result or error. Dropping or
    /// cancelling any caller, the leader included, does not stop the
    /// execution. Once it finishes the key is forgotten and the next call
    /// executes again.
    ///
    /// Returns [`CoalesceError::Canceled`] as soon as `ctx` is done, without
    /// affecting other callers. Must be called within a tokio runtime.
    pub async fn run<F, Fut>(
        &self,
        ctx: &RequestContext,
        key: K,
        fetch: F,
    ) -> Result<Shared<V>, CoalesceError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        if let Some(cause) = ctx.cause() {
            return Err(CoalesceError::Canceled(cause));
        }

        let (mut receiver, was_leader) = {
            let mut requests = self.in_flight.requests.lock();
            match requests.get(&key) {
                Some(sender) => (sender.subscribe(), false),
                None => {
                    // one result is ever sent per channel
                    let (sender, receiver) = broadcast::channel(1);
                    requests.insert(key.clone(), sender);
                    #[cfg(feature = "metrics")]
                    gauge!("coalesce_in_flight", "coalesce" => self.in_flight.name.clone())
                        .set(requests.len() as f64);
                    (receiver, true)
                }
            }
        };

        #[cfg(feature = "metrics")]
        counter!(
            "coalesce_requests_total",
            "coalesce" => self.in_flight.name.clone(),
            "role" => if was_leader { "leader" } else { "follower" }
        )
        .increment(1);

        #[cfg(feature = "tracing")]
        debug!(
            coalesce = %self.in_flight.name,
            role = if was_leader { "leader" } else { "follower" },
            "request deduplicated"
        );

        if was_leader {
            let completion = Completion {
                in_flight: Arc::clone(&self.in_flight),
                key: Some(key),
            };
            let future = fetch();
            tokio::spawn(async move {
                let outcome = future.await;
                completion.finish(outcome);
            });
        }

        tokio::select! {
            biased;
            cause = ctx.done() => Err(CoalesceError::Canceled(cause)),
            received = receiver.recv() => match received {
                Ok(Ok(value)) => Ok(Shared { value, was_leader }),
                Ok(Err(err)) => Err(CoalesceError::Upstream(err)),
                Err(_) => Err(CoalesceError::Aborted),
            },
        }
    }

    /// Number of keys with an execution in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.requests.lock().len()
    }

    /// Returns true if an execution for `key` is in flight.
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.in_flight.requests.lock().contains_key(key)
    }

    /// The instance name.
    pub fn name(&self) -> &str {
        &self.in_flight.name
    }
}
