//! Tower middleware running any service through a [`ResilientClient`].

use crate::client::ResilientClient;
use futures::future::BoxFuture;
use outbound_resilience_core::{RequestContext, ResilienceError};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::ServiceExt;
use tower_layer::Layer;
use tower_service::Service;

/// Applies the resilient pipeline to an inner service.
///
/// Requests are keyed by `key_fn`: requests with equal keys share one
/// execution and one cache entry. The inner service's error becomes
/// [`ResilienceError::Upstream`] and counts against the circuit breaker.
///
/// ```rust
/// use outbound_resilience::{ResilienceConfig, ResilienceLayer, ResilientClient};
/// use tower::{service_fn, Layer, ServiceExt};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let client: ResilientClient<String, String> =
///     ResilientClient::new(ResilienceConfig::default()).unwrap();
///
/// let lookup = service_fn(|id: u32| async move { Ok::<_, String>(format!("company {}", id)) });
/// let service = ResilienceLayer::new(client, |id: &u32| id.to_string()).layer(lookup);
///
/// assert_eq!(service.oneshot(7).await.unwrap(), "company 7");
/// # }
/// ```
pub struct ResilienceLayer<V, E, F> {
    client: ResilientClient<V, E>,
    key_fn: Arc<F>,
}

impl<V, E, F> ResilienceLayer<V, E, F> {
    pub fn new(client: ResilientClient<V, E>, key_fn: F) -> Self {
        Self {
            client,
            key_fn: Arc::new(key_fn),
        }
    }
}

impl<V, E, F> Clone for ResilienceLayer<V, E, F> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            key_fn: Arc::clone(&self.key_fn),
        }
    }
}

impl<S, V, E, F> Layer<S> for ResilienceLayer<V, E, F> {
    type Service = ResilienceService<S, V, E, F>;

    fn layer(&self, inner: S) -> Self::Service {
        ResilienceService {
            inner,
            client: self.client.clone(),
            key_fn: Arc::clone(&self.key_fn),
        }
    }
}

/// Service produced by [`ResilienceLayer`].
pub struct ResilienceService<S, V, E, F> {
    inner: S,
    client: ResilientClient<V, E>,
    key_fn: Arc<F>,
}

impl<S: Clone, V, E, F> Clone for ResilienceService<S, V, E, F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            client: self.client.clone(),
            key_fn: Arc::clone(&self.key_fn),
        }
    }
}

impl<S, V, E, F> ResilienceService<S, V, E, F> {
    /// The client shared by every clone of this service.
    pub fn client(&self) -> &ResilientClient<V, E> {
        &self.client
    }
}

impl<S, Req, V, E, F> Service<Req> for ResilienceService<S, V, E, F>
where
    S: Service<Req, Response = V, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + 'static,
    F: Fn(&Req) -> String + Send + Sync + 'static,
{
    type Response = V;
    type Error = ResilienceError<E>;
    type Future = BoxFuture<'static, Result<V, ResilienceError<E>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // the inner clone that serves a call is driven to readiness there
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Req) -> Self::Future {
        let key = (self.key_fn)(&request);
        let client = self.client.clone();
        let inner = self.inner.clone();

        Box::pin(async move {
            let ctx = RequestContext::new();
            client
                .run(key, &ctx, move || async move {
                    inner
                        .oneshot(request)
                        .await
                        .map_err(ResilienceError::Upstream)
                })
                .await
        })
    }
}
