use crate::Result;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Pacing floor between platform calls, roughly 92 calls per minute.
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(650);
/// Cooldown before the single retry after the platform reports rate limiting.
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

/// Spaces calls to the platform API and absorbs one rate-limit rejection per
/// call by sleeping through the cooldown and retrying exactly once. The
/// limiter is the sole serialization point for pacing, so a shared instance
/// keeps the interval contract even if callers ever fan out.
pub struct RateLimiter {
    min_interval: Duration,
    cooldown: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_intervals(MIN_REQUEST_INTERVAL, RATE_LIMIT_COOLDOWN)
    }

    pub fn with_intervals(min_interval: Duration, cooldown: Duration) -> Self {
        Self {
            min_interval,
            cooldown,
            last_call: Mutex::new(None),
        }
    }

    /// Runs `op` no sooner than `min_interval` after the previous successful
    /// call. A first rate-limit error waits out the cooldown and retries
    /// once; a second one, and any other error, propagates.
    pub async fn call<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.paced(&op).await {
            Err(err) if err.is_rate_limit() => {
                tracing::warn!(error = %err, "rate limited, retrying after cooldown");
                tokio::time::sleep(self.cooldown).await;
                self.paced(&op).await
            }
            other => other,
        }
    }

    async fn paced<T, F, Fut>(&self, op: &F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let wait = {
            let last = self.last_call.lock().await;
            match *last {
                Some(at) => self.min_interval.saturating_sub(at.elapsed()),
                None => Duration::ZERO,
            }
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        let result = op().await;
        if result.is_ok() {
            *self.last_call.lock().await = Some(Instant::now());
        }
        result
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::RateLimiter;
    use crate::{Error, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_calls_are_spaced_by_min_interval() -> Result<()> {
        let limiter = RateLimiter::with_intervals(Duration::from_millis(25), Duration::ZERO);

        let start = Instant::now();
        for _ in 0..4 {
            limiter.call(|| async { Ok(()) }).await?;
        }

        assert!(start.elapsed() >= Duration::from_millis(75));
        Ok(())
    }

    #[tokio::test]
    async fn test_retries_once_after_rate_limit() -> Result<()> {
        let limiter = RateLimiter::with_intervals(Duration::ZERO, Duration::from_millis(5));
        let attempts = AtomicUsize::new(0);

        let result = limiter
            .call(|| async {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(Error::RateLimited("slow down".to_string()))
                } else {
                    Ok(42)
                }
            })
            .await?;

        assert_eq!(result, 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_second_rate_limit_error_propagates() {
        let limiter = RateLimiter::with_intervals(Duration::ZERO, Duration::from_millis(5));
        let attempts = AtomicUsize::new(0);

        let result: Result<()> = limiter
            .call(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(Error::RateLimited("still throttled".to_string()))
            })
            .await;

        assert!(matches!(result, Err(Error::RateLimited(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_other_errors_propagate_without_retry() {
        let limiter = RateLimiter::with_intervals(Duration::ZERO, Duration::from_millis(5));
        let attempts = AtomicUsize::new(0);

        let result: Result<()> = limiter
            .call(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(Error::Upstream("connection reset".to_string()))
            })
            .await;

        assert!(matches!(result, Err(Error::Upstream(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
