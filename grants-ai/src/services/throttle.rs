//! Outbound call throttle
//!
//! Every classifier call in the process goes through one `CallThrottle`.
//! Two limits apply together:
//! - call starts are spaced at least `interval` apart (token bucket, burst 1)
//! - at most `max_in_flight` calls run at once (semaphore)

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;

#[derive(Debug, Error)]
#[error("Call throttle is closed")]
pub struct ThrottleClosed;

pub struct CallThrottle {
    /// `None` when the interval is zero (no spacing)
    rate_limiter: Option<DefaultDirectRateLimiter>,
    in_flight: Semaphore,
    interval: Duration,
    max_in_flight: usize,
}

impl CallThrottle {
    /// Build a throttle; `max_in_flight` of zero is treated as one
    pub fn new(interval: Duration, max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        let rate_limiter = Quota::with_period(interval).map(RateLimiter::direct);

        Self {
            rate_limiter,
            in_flight: Semaphore::new(max_in_flight),
            interval,
            max_in_flight,
        }
    }

    /// One call at a time, one start per `interval`
    pub fn serial(interval: Duration) -> Self {
        Self::new(interval, 1)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Wait for a slot, then run `call` while holding it
    pub async fn run<F, Fut, T>(&self, call: F) -> Result<T, ThrottleClosed>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _permit = self.in_flight.acquire().await.map_err(|_| ThrottleClosed)?;

        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        Ok(call().await)
    }
}
