//! File-backed cache backend
//!
//! One JSON document per entry, named by the SHA-256 of its key. Writes go
//! to a uniquely named temp file first and are renamed into place, so readers
//! never observe a partially written entry. Expiry is wall-clock based so it
//! survives restarts.

use super::backend::CacheBackend;
use crate::error::{Error, Result};
use crate::types::Payload;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const ENTRY_EXTENSION: &str = "json";

/// Stored form of one cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: Payload,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: Payload, ttl: Duration) -> Self {
        // Far-future cap keeps the addition from overflowing.
        let ttl = chrono::Duration::from_std(ttl)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100))
            .min(chrono::Duration::days(365 * 100));
        Self {
            key: key.into(),
            value,
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Durable cache rooted at a directory
#[derive(Debug, Clone)]
pub struct FileCache {
    directory: PathBuf,
}

impl FileCache {
    /// Open (creating if needed) a cache directory
    pub async fn open(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&directory).await.map_err(|e| {
            Error::cache(format!(
                "Failed to create cache directory {}: {e}",
                directory.display()
            ))
        })?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.directory.join(format!("{digest}.{ENTRY_EXTENSION}"))
    }

    async fn read_entry(path: &Path) -> Result<Option<CacheEntry>> {
        let contents = match tokio::fs::read(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::cache(format!(
                    "Failed to read cache entry {}: {e}",
                    path.display()
                )))
            }
        };
        match serde_json::from_slice(&contents) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Discarding corrupt cache entry");
                Self::delete(path).await?;
                Ok(None)
            }
        }
    }

    async fn delete(path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::cache(format!(
                "Failed to remove cache entry {}: {e}",
                path.display()
            ))),
        }
    }

    async fn entry_paths(&self) -> Result<Vec<PathBuf>> {
        let mut dir = tokio::fs::read_dir(&self.directory).await.map_err(|e| {
            Error::cache(format!(
                "Failed to list cache directory {}: {e}",
                self.directory.display()
            ))
        })?;
        let mut paths = Vec::new();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| Error::cache(format!("Failed to list cache directory: {e}")))?
        {
            let path = item.path();
            if path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

#[async_trait]
impl CacheBackend for FileCache {
    async fn get(&self, key: &str) -> Result<Option<Payload>> {
        let path = self.path_for(key);
        let Some(entry) = Self::read_entry(&path).await? else {
            return Ok(None);
        };
        if entry.key != key {
            debug!(key = %key, "Cache file holds a different key");
            return Ok(None);
        }
        if !entry.is_live(Utc::now()) {
            Self::delete(&path).await?;
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    async fn set(&self, key: &str, value: &Payload, ttl: Duration) -> Result<()> {
        let path = self.path_for(key);
        if ttl.is_zero() {
            return Self::delete(&path).await;
        }
        let entry = CacheEntry::new(key, value.clone(), ttl);
        let contents = serde_json::to_vec(&entry)
            .map_err(|e| Error::cache(format!("Failed to serialize cache entry: {e}")))?;

        // Unique temp name so concurrent writers of one key cannot interleave.
        let suffix: u64 = rand::thread_rng().gen();
        let temp_path = path.with_extension(format!("{suffix:016x}.tmp"));
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::cache(format!("Failed to write cache entry: {e}")))?;
        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(Error::cache(format!("Failed to rename cache entry: {e}")));
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        Self::delete(&self.path_for(key)).await
    }

    async fn clear(&self) -> Result<()> {
        for path in self.entry_paths().await? {
            Self::delete(&path).await?;
        }
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut purged = 0;
        for path in self.entry_paths().await? {
            match Self::read_entry(&path).await? {
                Some(entry) if entry.is_live(now) => {}
                Some(_) => {
                    Self::delete(&path).await?;
                    purged += 1;
                }
                // Vanished, or corrupt and already deleted by read_entry.
                None => {}
            }
        }
        Ok(purged)
    }
}
