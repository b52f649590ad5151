//! Rate limiter with a concurrency ceiling
//!
//! Admission requires both a free in-flight slot and one token from the
//! bucket. Waiting callers poll with random jitter so they do not wake in
//! lockstep. The poll step is shared; `acquire` suspends cooperatively on the
//! tokio timer and `acquire_blocking` parks the calling thread.

use super::bucket::TokenBucket;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Configuration for rate limiting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Sustained requests per second (token refill rate)
    pub requests_per_second: f64,
    /// Burst size (max tokens in bucket)
    pub burst_size: u32,
    /// Maximum requests in flight at once
    pub max_concurrent: usize,
    /// Re-check interval while waiting for a concurrency slot
    #[serde(with = "crate::config::millis")]
    pub poll_interval: Duration,
    /// Upper bound of the random delay added to every wait
    #[serde(with = "crate::config::millis")]
    pub max_jitter: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 2.0,
            burst_size: 5,
            max_concurrent: 8,
            poll_interval: Duration::from_millis(50),
            max_jitter: Duration::from_millis(25),
        }
    }
}

impl RateLimiterConfig {
    /// Create a new rate limiter config
    pub fn new(requests_per_second: f64, burst_size: u32, max_concurrent: usize) -> Self {
        Self {
            requests_per_second,
            burst_size,
            max_concurrent,
            ..Self::default()
        }
    }

    /// Effectively unthrottled; useful against local mock servers
    pub fn unthrottled() -> Self {
        Self {
            requests_per_second: 10_000.0,
            burst_size: 10_000,
            max_concurrent: 1_024,
            poll_interval: Duration::from_millis(1),
            max_jitter: Duration::ZERO,
        }
    }
}

#[derive(Debug)]
struct LimiterState {
    bucket: TokenBucket,
    active: usize,
}

/// Token-bucket rate limiter with bounded concurrency
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: &RateLimiterConfig) -> Self {
        Self {
            config: config.clone(),
            state: Mutex::new(LimiterState {
                bucket: TokenBucket::new(config.requests_per_second, f64::from(config.burst_size)),
                active: 0,
            }),
        }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Requests currently holding a slot
    pub fn active(&self) -> usize {
        self.lock().active
    }

    /// Tokens currently in the bucket
    pub fn available_tokens(&self) -> f64 {
        self.lock().bucket.available()
    }

    /// Try to acquire a slot and a token, returning immediately
    pub fn try_acquire(&self) -> bool {
        self.try_admit(Instant::now()).is_ok()
    }

    /// Wait (cooperatively) up to `timeout` for a slot and a token.
    ///
    /// Returns `false` on timeout with nothing acquired.
    pub async fn acquire(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let wait = match self.try_admit(Instant::now()) {
                Ok(()) => return true,
                Err(wait) => wait,
            };
            match self.next_sleep(wait, deadline) {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return self.timed_out(timeout),
            }
        }
    }

    /// Blocking-thread variant of [`RateLimiter::acquire`].
    ///
    /// Standalone thread-parking admission for callers that share a limiter
    /// without going through a transport; `crate::blocking` drives the async
    /// path on its own runtime instead.
    pub fn acquire_blocking(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let wait = match self.try_admit(Instant::now()) {
                Ok(()) => return true,
                Err(wait) => wait,
            };
            match self.next_sleep(wait, deadline) {
                Some(delay) => std::thread::sleep(delay),
                None => return self.timed_out(timeout),
            }
        }
    }

    /// Acquire and wrap the slot in a guard that releases it on drop
    pub async fn acquire_permit(&self, timeout: Duration) -> Option<RatePermit<'_>> {
        if self.acquire(timeout).await {
            Some(RatePermit { limiter: self })
        } else {
            None
        }
    }

    /// Give back a concurrency slot. Call exactly once per successful acquire.
    pub fn release(&self) {
        let mut state = self.lock();
        if state.active == 0 {
            warn!("Rate limiter release without a matching acquire");
            return;
        }
        state.active -= 1;
    }

    /// One admission attempt; on refusal returns how long to wait before the
    /// next attempt could plausibly succeed.
    fn try_admit(&self, now: Instant) -> std::result::Result<(), Duration> {
        let mut state = self.lock();
        if state.active >= self.config.max_concurrent {
            return Err(self.config.poll_interval);
        }
        if state.bucket.try_consume_at(1.0, now) {
            state.active += 1;
            trace!(active = state.active, "Rate limiter admitted request");
            Ok(())
        } else {
            Err(state.bucket.time_to_available_at(1.0, now))
        }
    }

    fn next_sleep(&self, wait: Duration, deadline: Instant) -> Option<Duration> {
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        let remaining = deadline - now;
        Some(wait.saturating_add(self.jitter()).min(remaining))
    }

    fn jitter(&self) -> Duration {
        let max = self.config.max_jitter.as_millis() as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max))
    }

    fn timed_out(&self, timeout: Duration) -> bool {
        warn!(timeout_ms = timeout.as_millis() as u64, "Rate limiter admission timed out");
        false
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(&RateLimiterConfig::default())
    }
}

/// An admitted request; releases its concurrency slot when dropped
#[derive(Debug)]
pub struct RatePermit<'a> {
    limiter: &'a RateLimiter,
}

impl Drop for RatePermit<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}
