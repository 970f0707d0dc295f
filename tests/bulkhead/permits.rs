use outbound_resilience_bulkhead::{ConcurrencyLimiter, LimiterConfig, LimiterError};
use outbound_resilience_core::{CancelCause, RequestContext};
use std::time::Duration;

fn limiter(max_concurrent: usize, max_wait: Option<Duration>) -> ConcurrencyLimiter {
    ConcurrencyLimiter::new(LimiterConfig {
        max_concurrent,
        max_wait,
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn pre_cancelled_context_returns_immediately_without_a_permit() {
    let limiter = limiter(1, None);
    let held = limiter.acquire(&RequestContext::new()).await.unwrap();

    let ctx = RequestContext::new();
    ctx.cancel();
    let err = limiter.acquire(&ctx).await.unwrap_err();
    assert_eq!(err, LimiterError::Canceled(CancelCause::Canceled));

    drop(held);
    assert_eq!(limiter.available(), 1);
    let again = limiter.acquire(&RequestContext::new()).await.unwrap();
    assert_eq!(limiter.in_use(), 1);
    again.release();
    assert_eq!(limiter.in_use(), 0);
}

#[tokio::test]
async fn pre_cancelled_context_wins_even_with_free_slots() {
    let limiter = limiter(4, None);
    let ctx = RequestContext::new();
    ctx.cancel();

    assert!(limiter.acquire(&ctx).await.is_err());
    assert_eq!(limiter.available(), 4);
}

#[tokio::test(start_paused = true)]
async fn deadline_ends_the_wait() {
    let limiter = limiter(1, None);
    let _held = limiter.acquire(&RequestContext::new()).await.unwrap();

    let ctx = RequestContext::with_timeout(Duration::from_millis(50));
    let err = limiter.acquire(&ctx).await.unwrap_err();
    assert_eq!(err, LimiterError::Canceled(CancelCause::DeadlineExceeded));
    assert_eq!(limiter.in_use(), 1);
}

#[tokio::test(start_paused = true)]
async fn max_wait_bounds_the_wait() {
    let limiter = limiter(1, Some(Duration::from_millis(20)));
    let _held = limiter.acquire(&RequestContext::new()).await.unwrap();

    let err = limiter.acquire(&RequestContext::new()).await.unwrap_err();
    assert!(matches!(err, LimiterError::Timeout { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn never_exceeds_max_concurrent() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let limiter = limiter(3, None);
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..30)
        .map(|_| {
            let limiter = limiter.clone();
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            tokio::spawn(async move {
                let _permit = limiter.acquire(&RequestContext::new()).await.unwrap();
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                current.fetch_sub(1, Ordering::SeqCst);
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(limiter.available(), 3);
}
