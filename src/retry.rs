use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::Retry;

use crate::config::ScraperConfig;
use crate::rate_limiter::RateLimiter;

/// Bounded exponential backoff: `base * 2^n`, each wait capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            max_retries: config.max_retries as usize,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }

    /// Waits between attempts, one per retry.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> {
        let base = self.base_delay;
        let max = self.max_delay;
        (0..self.max_retries).map(move |n| {
            let factor = 1u32.checked_shl(n as u32).unwrap_or(u32::MAX);
            base.saturating_mul(factor).min(max)
        })
    }

    pub fn max_attempts(&self) -> usize {
        self.max_retries + 1
    }
}

/// Runs network-bound operations behind the rate limiter with retries.
#[derive(Debug, Clone)]
pub struct Retrier {
    policy: RetryPolicy,
    limiter: Arc<RateLimiter>,
}

impl Retrier {
    pub fn new(policy: RetryPolicy, limiter: Arc<RateLimiter>) -> Self {
        Self { policy, limiter }
    }

    /// Waits on the shared limiter without retrying, for one-shot interactions.
    pub async fn throttle(&self) {
        self.limiter.throttle().await
    }

    /// Runs `operation` until it succeeds or the policy is exhausted. Every
    /// attempt, the first included, waits on the rate limiter before running.
    /// The last error is returned as-is.
    ///
    /// `operation` must return a lazy future: nothing may hit the network
    /// before the future is first polled.
    pub async fn with_retry<T, E, F, Fut>(
        &self,
        manufacturer: &str,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let limiter = &self.limiter;
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0usize;

        Retry::start(self.policy.schedule(), || {
            attempt += 1;
            let current = attempt;
            let fut = operation();
            async move {
                limiter.throttle().await;
                fut.await.map_err(|err| {
                    metrics::counter!("enricher_retry_attempts_total").increment(1);
                    tracing::warn!(
                        manufacturer,
                        attempt = current,
                        max_attempts,
                        error = %err,
                        "Scrape attempt failed"
                    );
                    err
                })
            }
        })
        .await
    }
}
