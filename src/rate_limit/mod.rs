//! Rate limiting module
//!
//! Keeps the client inside the server's request budget.
//!
//! # Features
//!
//! - **Token Bucket**: `TokenBucket` accrues permits at a fixed rate up to a cap
//! - **Concurrency Ceiling**: `RateLimiter` bounds requests in flight
//! - **Scoped Release**: `RatePermit` gives the slot back on every exit path

mod bucket;
mod limiter;

pub use bucket::TokenBucket;
pub use limiter::{RateLimiter, RateLimiterConfig, RatePermit};

#[cfg(test)]
mod tests;
