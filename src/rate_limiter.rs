use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;

/// Minimum-interval throttle shared by every request a scraper makes.
///
/// Each caller reserves the next free slot while holding the lock, then
/// sleeps outside of it. Request starts are spaced by at least
/// `60s / requests_per_minute`, while the requests themselves may still
/// overlap.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let rpm = if requests_per_minute == 0 {
            DEFAULT_REQUESTS_PER_MINUTE
        } else {
            requests_per_minute
        };

        Self {
            min_interval: Duration::from_millis(60_000 / rpm as u64),
            last_request: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Suspends until the interval since the previous permitted request has elapsed.
    pub async fn throttle(&self) {
        let slot = {
            let mut last = self.last_request.lock().await;
            let now = Instant::now();
            let slot = match *last {
                Some(previous) => (previous + self.min_interval).max(now),
                None => now,
            };
            *last = Some(slot);
            slot
        };

        let now = Instant::now();
        if slot > now {
            let wait_ms = (slot - now).as_millis() as u64;
            tracing::trace!(wait_ms, "throttling request");
        }
        tokio::time::sleep_until(slot).await;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_MINUTE)
    }
}
