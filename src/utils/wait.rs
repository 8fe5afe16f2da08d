//! Bounded polling primitives.
//!
//! Every wait in the lifecycle goes through these two helpers. They read
//! time from `tokio::time`, so tests drive them with a paused clock instead
//! of real sleeps.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tokio::time::Instant;

/// Poll `poll_fn` every `interval` until it yields `Some` or `timeout` elapses.
///
/// `poll_fn` always runs at least once. Returns no later than `timeout` plus
/// one `interval` (plus the duration of the last poll).
pub async fn wait_for_condition<F, Fut, T>(
    mut poll_fn: F,
    interval: Duration,
    timeout: Duration,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = poll_fn().await {
            return Some(value);
        }
        if Instant::now() >= deadline {
            return None;
        }
        sleep(interval).await;
    }
}

/// Poll `poll_fn` at most `1 + max_retries` times, `interval` apart.
pub async fn poll_with_budget<F, Fut, T>(
    mut poll_fn: F,
    interval: Duration,
    max_retries: usize,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let mut retries = 0;
    loop {
        if let Some(value) = poll_fn().await {
            return Some(value);
        }
        if retries >= max_retries {
            return None;
        }
        retries += 1;
        sleep(interval).await;
    }
}
