//! In-memory cache backend using DashMap for thread safety

use super::backend::CacheBackend;
use crate::error::Result;
use crate::types::Payload;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Upper bound on how far in the future an entry may expire
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Payload,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Process-local cache, bounded by entry count
#[derive(Debug)]
pub struct MemoryCache {
    entries: DashMap<String, MemoryEntry>,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Entries currently held, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_expired(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    /// Drop the entry closest to expiry, other than `keep`. Returns false
    /// when there was nothing to drop.
    fn evict_soonest(&self, keep: &str) -> bool {
        let victim = self
            .entries
            .iter()
            .filter(|entry| entry.key() != keep)
            .min_by_key(|entry| entry.value().expires_at)
            .map(|entry| entry.key().clone());
        match victim {
            Some(key) => {
                debug!(key = %key, "Evicting cache entry at capacity");
                self.entries.remove(&key);
                true
            }
            None => false,
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Payload>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                return Ok(Some(entry.value.clone()));
            }
        }
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        Ok(None)
    }

    async fn set(&self, key: &str, value: &Payload, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            self.entries.remove(key);
            return Ok(());
        }
        let now = Instant::now();
        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            self.evict_expired(now);
        }
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.clone(),
                expires_at: now + ttl.min(MAX_TTL),
            },
        );
        // Concurrent inserts can overshoot the bound; trim after our own.
        while self.entries.len() > self.max_entries {
            if !self.evict_soonest(key) {
                break;
            }
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        Ok(self.evict_expired(Instant::now()))
    }
}
