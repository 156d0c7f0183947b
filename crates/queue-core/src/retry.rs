//! Fixed-delay, unbounded retry for writes that must eventually land in
//! storage. There is no backoff curve and no retry cap by design: the
//! queue treats storage as the single source of truth, so a write that
//! never lands (a completion, a failure note, a cancellation) would
//! leave storage and the in-memory world permanently disagreeing.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Retries `op` every five seconds until it succeeds or `shutdown` is
/// cancelled, in which case the write is abandoned mid-retry.
pub async fn retry_until_success<F, Fut, E>(mut op: F, shutdown: &CancellationToken)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            result = op() => {
                match result {
                    Ok(()) => return,
                    Err(e) => warn!(error = %e, "storage write failed, retrying in 5s"),
                }
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(RETRY_DELAY) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn succeeds_immediately_without_sleeping() {
        let calls = AtomicUsize::new(0);
        let shutdown = CancellationToken::new();

        retry_until_success(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<(), String>(()) }
            },
            &shutdown,
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let calls = AtomicUsize::new(0);
        let shutdown = CancellationToken::new();

        retry_until_success(
            || {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err("not yet".to_string())
                    } else {
                        Ok(())
                    }
                }
            },
            &shutdown,
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_abandons_the_retry() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        retry_until_success(|| async { Err::<(), _>("always fails".to_string()) }, &shutdown).await;
    }
}
