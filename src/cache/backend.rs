//! Cache backend trait

use crate::error::Result;
use crate::types::Payload;
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

/// Key/value store with per-entry time-to-live.
///
/// Implementations must be safe under concurrent use and must never return
/// an entry whose TTL has elapsed, whether or not it has been purged yet.
#[async_trait]
pub trait CacheBackend: Send + Sync + Debug {
    /// Look up a live entry
    async fn get(&self, key: &str) -> Result<Option<Payload>>;

    /// Store `value` for `ttl`. A zero TTL stores nothing.
    async fn set(&self, key: &str, value: &Payload, ttl: Duration) -> Result<()>;

    /// Drop one entry
    async fn remove(&self, key: &str) -> Result<()>;

    /// Drop every entry
    async fn clear(&self) -> Result<()>;

    /// Physically remove expired entries, returning how many were dropped
    async fn purge_expired(&self) -> Result<usize>;
}

/// Backend that stores nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

#[async_trait]
impl CacheBackend for NullCache {
    async fn get(&self, _key: &str) -> Result<Option<Payload>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &Payload, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    async fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        Ok(0)
    }
}
