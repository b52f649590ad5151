//! Token bucket
//!
//! Tokens accrue at `refill_rate` per second up to `capacity`; each request
//! consumes tokens. All time-dependent operations have an `_at` variant that
//! takes the observation instant explicitly.

use std::time::{Duration, Instant};

/// Refillable token budget
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket
    ///
    /// `refill_rate` is tokens per second. Non-finite or negative inputs are
    /// clamped to zero.
    pub fn new(refill_rate: f64, capacity: f64) -> Self {
        Self::new_at(refill_rate, capacity, Instant::now())
    }

    /// Create a full bucket whose refill clock starts at `now`
    pub fn new_at(refill_rate: f64, capacity: f64, now: Instant) -> Self {
        let capacity = sanitize(capacity);
        Self {
            capacity,
            refill_rate: sanitize(refill_rate),
            tokens: capacity,
            last_refill: now,
        }
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    /// Tokens available right now
    pub fn available(&mut self) -> f64 {
        self.available_at(Instant::now())
    }

    /// Tokens available at `now`, after refilling
    pub fn available_at(&mut self, now: Instant) -> f64 {
        self.refill(now);
        self.tokens
    }

    /// Consume `n` tokens if available
    pub fn try_consume(&mut self, n: f64) -> bool {
        self.try_consume_at(n, Instant::now())
    }

    /// Consume `n` tokens at `now` if available; never blocks
    pub fn try_consume_at(&mut self, n: f64, now: Instant) -> bool {
        self.refill(now);
        if n < 0.0 || !n.is_finite() {
            return false;
        }
        if self.tokens >= n {
            self.tokens -= n;
            true
        } else {
            false
        }
    }

    /// Wait until `n` tokens will be available
    pub fn time_to_available(&mut self, n: f64) -> Duration {
        self.time_to_available_at(n, Instant::now())
    }

    /// Wait, measured from `now`, until `n` tokens will be available.
    ///
    /// Returns [`Duration::MAX`] when `n` exceeds capacity or the bucket never
    /// refills.
    pub fn time_to_available_at(&mut self, n: f64, now: Instant) -> Duration {
        self.refill(now);
        if self.tokens >= n {
            return Duration::ZERO;
        }
        if n > self.capacity || self.refill_rate <= 0.0 {
            return Duration::MAX;
        }
        let missing = n - self.tokens;
        Duration::from_secs_f64(missing / self.refill_rate)
    }

    fn refill(&mut self, now: Instant) {
        // Observations earlier than the last refill do not move the clock back.
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed.is_zero() {
            return;
        }
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
