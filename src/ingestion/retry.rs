//! Retry/backoff policy for upstream calls (spec §4.1), via the `backoff`
//! crate rather than the teacher's hand-rolled `2^failures` cap - the
//! ecosystem crate adds jitter, which the teacher's `sync::run_sync` loop
//! doesn't.

use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;

use crate::config::LimitsConfig;
use crate::error::Error;

pub fn build_backoff(limits: &LimitsConfig) -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: limits.initial_backoff,
        max_interval: limits.max_backoff,
        max_elapsed_time: None,
        ..ExponentialBackoff::default()
    }
}

/// Run `op` with retries, backing off between attempts, stopping immediately
/// on a non-retryable error. `op` is retried until it returns `Ok` or an
/// error [`Error::is_retryable`] says is not worth retrying.
pub async fn retry_with_backoff<F, Fut, T>(limits: &LimitsConfig, mut op: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, Error>>,
{
    let mut backoff = build_backoff(limits);
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => match backoff.next_backoff() {
                Some(delay) => {
                    tracing::warn!(error = %e, delay_ms = delay.as_millis() as u64, "retrying after backoff");
                    tokio::time::sleep(delay).await;
                }
                None => return Err(e),
            },
        }
    }
}

/// A plain, jitter-free delay used only by the circuit-breaker's half-open
/// probe scheduling, kept separate from the retry backoff so probe cadence
/// doesn't depend on how many attempts preceded it.
pub fn fixed_delay(d: Duration) -> Duration {
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn retries_until_success() {
        let limits = LimitsConfig {
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            ..Default::default()
        };
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let result = retry_with_backoff(&limits, move || {
            let attempts = attempts_clone.clone();
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(Error::UpstreamUnavailable("not yet".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_stop_immediately() {
        let limits = LimitsConfig::default();
        let result: Result<(), Error> =
            retry_with_backoff(&limits, || async { Err(Error::ConstraintViolation("bad".into())) }).await;
        assert!(result.is_err());
    }
}
