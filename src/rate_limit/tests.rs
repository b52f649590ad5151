//! Tests for the rate limiting module

use super::*;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

// ============================================================================
// TokenBucket Tests
// ============================================================================

#[test]
fn test_bucket_starts_full() {
    let now = Instant::now();
    let mut bucket = TokenBucket::new_at(2.0, 5.0, now);
    assert_eq!(bucket.capacity(), 5.0);
    assert_eq!(bucket.refill_rate(), 2.0);
    assert_eq!(bucket.available_at(now), 5.0);
}

#[test]
fn test_bucket_burst_then_wait() {
    let now = Instant::now();
    let mut bucket = TokenBucket::new_at(2.0, 5.0, now);

    for _ in 0..5 {
        assert!(bucket.try_consume_at(1.0, now));
    }
    assert!(!bucket.try_consume_at(1.0, now));

    let wait = bucket.time_to_available_at(1.0, now);
    assert!((wait.as_secs_f64() - 0.5).abs() < 1e-9, "wait was {wait:?}");
}

#[test]
fn test_bucket_refills_over_time() {
    let start = Instant::now();
    let mut bucket = TokenBucket::new_at(2.0, 5.0, start);
    assert!(bucket.try_consume_at(5.0, start));

    let later = start + Duration::from_millis(500);
    assert!(bucket.try_consume_at(1.0, later));
    assert!(!bucket.try_consume_at(1.0, later));
}

#[test]
fn test_bucket_refill_is_capped() {
    let start = Instant::now();
    let mut bucket = TokenBucket::new_at(100.0, 3.0, start);
    assert!(bucket.try_consume_at(1.0, start));
    let much_later = start + Duration::from_secs(60);
    assert_eq!(bucket.available_at(much_later), 3.0);
}

#[test]
fn test_bucket_failed_consume_has_no_effect() {
    let now = Instant::now();
    let mut bucket = TokenBucket::new_at(1.0, 2.0, now);
    assert!(!bucket.try_consume_at(3.0, now));
    assert_eq!(bucket.available_at(now), 2.0);
}

#[test]
fn test_bucket_time_to_available_edge_cases() {
    let now = Instant::now();
    let mut bucket = TokenBucket::new_at(1.0, 2.0, now);
    assert_eq!(bucket.time_to_available_at(1.0, now), Duration::ZERO);
    assert_eq!(bucket.time_to_available_at(3.0, now), Duration::MAX);

    let mut frozen = TokenBucket::new_at(0.0, 1.0, now);
    assert!(frozen.try_consume_at(1.0, now));
    assert_eq!(frozen.time_to_available_at(1.0, now), Duration::MAX);
}

#[test]
fn test_bucket_ignores_earlier_observation() {
    let start = Instant::now();
    let later = start + Duration::from_secs(1);
    let mut bucket = TokenBucket::new_at(1.0, 1.0, later);
    assert!(bucket.try_consume_at(1.0, later));
    // An observation "before" the last refill must not mint tokens.
    assert!(!bucket.try_consume_at(1.0, start));
}

proptest! {
    #[test]
    fn test_bucket_tokens_stay_in_bounds(
        rate in 0.0f64..50.0,
        capacity in 0.0f64..20.0,
        ops in prop::collection::vec((0u64..2_000, 0.0f64..10.0), 1..64)
    ) {
        let start = Instant::now();
        let mut bucket = TokenBucket::new_at(rate, capacity, start);
        let mut now = start;
        for (advance_ms, n) in ops {
            now += Duration::from_millis(advance_ms);
            bucket.try_consume_at(n, now);
            let tokens = bucket.available_at(now);
            prop_assert!(tokens >= 0.0);
            prop_assert!(tokens <= capacity);
        }
    }
}

// ============================================================================
// RateLimiterConfig Tests
// ============================================================================

#[test]
fn test_rate_limiter_config_default() {
    let config = RateLimiterConfig::default();
    assert_eq!(config.requests_per_second, 2.0);
    assert_eq!(config.burst_size, 5);
    assert_eq!(config.max_concurrent, 8);
}

#[test]
fn test_rate_limiter_config_from_yaml() {
    let config: RateLimiterConfig = serde_yaml::from_str(
        "requests_per_second: 4\nburst_size: 2\npoll_interval: 10\n",
    )
    .unwrap();
    assert_eq!(config.requests_per_second, 4.0);
    assert_eq!(config.burst_size, 2);
    assert_eq!(config.poll_interval, Duration::from_millis(10));
    assert_eq!(config.max_concurrent, RateLimiterConfig::default().max_concurrent);
}

// ============================================================================
// RateLimiter Tests
// ============================================================================

#[test]
fn test_rate_limiter_allows_burst() {
    let limiter = RateLimiter::new(&RateLimiterConfig::new(1.0, 3, 10));
    for _ in 0..3 {
        assert!(limiter.try_acquire());
    }
    assert!(!limiter.try_acquire());
    assert_eq!(limiter.active(), 3);
}

#[test]
fn test_rate_limiter_concurrency_ceiling() {
    let limiter = RateLimiter::new(&RateLimiterConfig::new(1_000.0, 100, 2));
    assert!(limiter.try_acquire());
    assert!(limiter.try_acquire());
    assert!(!limiter.try_acquire());

    limiter.release();
    assert!(limiter.try_acquire());
    assert_eq!(limiter.active(), 2);
}

#[test]
fn test_rate_limiter_release_without_acquire() {
    let limiter = RateLimiter::default();
    limiter.release();
    assert_eq!(limiter.active(), 0);
}

#[tokio::test]
async fn test_rate_limiter_timeout_leaves_no_side_effects() {
    let limiter = RateLimiter::new(&RateLimiterConfig::new(1_000.0, 100, 1));
    assert!(limiter.acquire(Duration::from_millis(10)).await);

    let start = Instant::now();
    assert!(!limiter.acquire(Duration::from_millis(60)).await);
    assert!(start.elapsed() >= Duration::from_millis(60));
    assert_eq!(limiter.active(), 1);
}

#[tokio::test]
async fn test_rate_limiter_waits_for_tokens() {
    let mut config = RateLimiterConfig::new(20.0, 1, 10);
    config.max_jitter = Duration::ZERO;
    let limiter = RateLimiter::new(&config);

    assert!(limiter.acquire(Duration::from_millis(10)).await);
    limiter.release();

    let start = Instant::now();
    assert!(limiter.acquire(Duration::from_secs(1)).await);
    assert!(start.elapsed() >= Duration::from_millis(40));
}

#[tokio::test]
async fn test_rate_limiter_waits_for_slot() {
    let limiter = Arc::new(RateLimiter::new(&RateLimiterConfig::new(1_000.0, 100, 1)));
    assert!(limiter.try_acquire());

    let releaser = Arc::clone(&limiter);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        releaser.release();
    });

    assert!(limiter.acquire(Duration::from_secs(2)).await);
    assert_eq!(limiter.active(), 1);
}

#[tokio::test]
async fn test_rate_permit_releases_on_drop() {
    let limiter = RateLimiter::new(&RateLimiterConfig::new(1_000.0, 100, 1));
    {
        let permit = limiter.acquire_permit(Duration::from_millis(10)).await;
        assert!(permit.is_some());
        assert_eq!(limiter.active(), 1);
        assert!(limiter.acquire_permit(Duration::ZERO).await.is_none());
    }
    assert_eq!(limiter.active(), 0);
}

#[test]
fn test_rate_limiter_blocking_acquire() {
    let limiter = RateLimiter::new(&RateLimiterConfig::new(1_000.0, 100, 1));
    assert!(limiter.acquire_blocking(Duration::from_millis(10)));
    assert!(!limiter.acquire_blocking(Duration::from_millis(20)));
    limiter.release();
    assert!(limiter.acquire_blocking(Duration::from_millis(10)));
}

#[test]
fn test_rate_limiter_blocking_acquire_across_threads() {
    let limiter = Arc::new(RateLimiter::new(&RateLimiterConfig::new(1_000.0, 1_000, 2)));
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            std::thread::spawn(move || {
                assert!(limiter.acquire_blocking(Duration::from_secs(5)));
                assert!(limiter.active() <= 2);
                std::thread::sleep(Duration::from_millis(10));
                limiter.release();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(limiter.active(), 0);
}

#[tokio::test]
async fn test_rate_limiter_concurrent_callers_all_admitted() {
    let limiter = Arc::new(RateLimiter::new(&RateLimiterConfig::new(1_000.0, 1_000, 3)));
    let mut handles = Vec::new();
    for _ in 0..12 {
        let limiter = Arc::clone(&limiter);
        handles.push(tokio::spawn(async move {
            let permit = limiter.acquire_permit(Duration::from_secs(5)).await;
            assert!(permit.is_some());
            assert!(limiter.active() <= 3);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(limiter.active(), 0);
}
