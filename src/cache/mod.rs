//! Response cache module
//!
//! Avoids redundant network calls. The transport owns one backend and
//! shares it across every request it issues.
//!
//! # Overview
//!
//! - `CacheBackend` - async key/value store with per-entry TTL
//! - `MemoryCache` - process-local backend
//! - `FileCache` - durable backend, one file per entry
//! - `cache_key` - order-independent, credential-free request keys
//! - `TtlPolicy` - per-response lifetime decisions

mod backend;
mod file;
mod key;
mod memory;
mod ttl;

pub use backend::{CacheBackend, NullCache};
pub use file::{CacheEntry, FileCache};
pub use key::{cache_key, is_credential, CREDENTIAL_PARAMS};
pub use memory::MemoryCache;
pub use ttl::{is_bulk_harvest, is_historical, Route, TtlPolicy, TRANSITIONAL_STATUSES};

use crate::config::{CacheBackendKind, CacheConfig};
use crate::error::{Error, Result};
use std::sync::Arc;

/// Construct the backend a [`CacheConfig`] describes
pub async fn from_config(config: &CacheConfig) -> Result<Arc<dyn CacheBackend>> {
    Ok(match config.backend {
        CacheBackendKind::Memory => Arc::new(MemoryCache::new(config.max_entries)),
        CacheBackendKind::File => {
            let directory = config
                .directory
                .as_ref()
                .ok_or_else(|| Error::config("cache.directory is required for the file backend"))?;
            Arc::new(FileCache::open(directory).await?)
        }
        CacheBackendKind::None => Arc::new(NullCache),
    })
}

#[cfg(test)]
mod tests;
