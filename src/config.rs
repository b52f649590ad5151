//! Client configuration
//!
//! Everything the transport needs to talk to the catalog API, loadable from a
//! YAML or JSON file with every field defaulted. The API key can also come
//! from the environment and is never serialized or printed.

use crate::cache::TtlPolicy;
use crate::error::{Error, Result};
use crate::rate_limit::RateLimiterConfig;
use crate::types::Encoding;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "CATALOG_API_KEY";

/// Environment variable overriding the base URL
pub const BASE_URL_ENV: &str = "CATALOG_BASE_URL";

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.trove.nla.gov.au/v3";

// ============================================================================
// Top-Level Client Config
// ============================================================================

/// Complete client configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL for all requests
    pub base_url: String,

    /// API key sent with every request
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Header carrying the API key
    pub api_key_header: String,

    /// Response encoding requested via `Accept`
    pub encoding: Encoding,

    /// Per-request network timeout
    #[serde(with = "millis")]
    pub timeout: Duration,

    /// How long a request may wait for rate-limiter admission
    #[serde(with = "millis")]
    pub acquire_timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Retry and backoff behaviour
    pub retry: RetryConfig,

    /// Rate limiting
    pub rate_limit: RateLimiterConfig,

    /// Cache backend selection
    pub cache: CacheConfig,

    /// Cache lifetime policy
    pub ttl: TtlPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            api_key_header: "X-API-KEY".to_string(),
            encoding: Encoding::Json,
            timeout: Duration::from_secs(30),
            acquire_timeout: Duration::from_secs(30),
            user_agent: format!("catalog-client/{}", env!("CARGO_PKG_VERSION")),
            retry: RetryConfig::default(),
            rate_limit: RateLimiterConfig::default(),
            cache: CacheConfig::default(),
            ttl: TtlPolicy::default(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_header", &self.api_key_header)
            .field("encoding", &self.encoding)
            .field("timeout", &self.timeout)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("retry", &self.retry)
            .field("rate_limit", &self.rate_limit)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load a config file; `.json` files are parsed as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config: Self = if is_json {
            serde_json::from_str(&contents)?
        } else {
            serde_yaml::from_str(&contents)?
        };
        Ok(config)
    }

    /// Apply `CATALOG_API_KEY` / `CATALOG_BASE_URL` if set
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.base_url = url;
            }
        }
        self
    }

    /// Reject values the transport cannot work with
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)
            .map_err(|e| Error::config(format!("invalid base_url '{}': {e}", self.base_url)))?;
        if self.api_key_header.trim().is_empty() {
            return Err(Error::config("api_key_header must not be empty"));
        }
        let rate = &self.rate_limit;
        if !(rate.requests_per_second.is_finite() && rate.requests_per_second > 0.0) {
            return Err(Error::config("rate_limit.requests_per_second must be positive"));
        }
        if rate.burst_size == 0 {
            return Err(Error::config("rate_limit.burst_size must be at least 1"));
        }
        if rate.max_concurrent == 0 {
            return Err(Error::config("rate_limit.max_concurrent must be at least 1"));
        }
        self.retry.validate()?;
        if self.cache.backend == CacheBackendKind::File && self.cache.directory.is_none() {
            return Err(Error::config("cache.directory is required for the file backend"));
        }
        Ok(())
    }
}

/// Builder for [`ClientConfig`]
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Set the header that carries the API key
    pub fn api_key_header(mut self, header: impl Into<String>) -> Self {
        self.config.api_key_header = header.into();
        self
    }

    /// Set the response encoding
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.config.encoding = encoding;
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the rate-limiter admission timeout
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.config.acquire_timeout = timeout;
        self
    }

    /// Set retry behaviour
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.retry.max_retries = retries;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = config;
        self
    }

    /// Set the cache backend
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.config.cache = cache;
        self
    }

    /// Set the TTL policy
    pub fn ttl(mut self, ttl: TtlPolicy) -> Self {
        self.config.ttl = ttl;
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

// ============================================================================
// Retry Config
// ============================================================================

/// Exponential backoff: `base_delay * multiplier^attempt`, capped at
/// `max_delay`, then stretched by up to `jitter` (a fraction) at random.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    #[serde(with = "millis")]
    pub base_delay: Duration,
    pub multiplier: f64,
    #[serde(with = "millis")]
    pub max_delay: Duration,
    /// Fraction of the delay added at random, in `0.0..=1.0`
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: 0.25,
        }
    }
}

impl RetryConfig {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Deterministic backoff without jitter
    pub fn fixed(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: 0.0,
        }
    }

    /// Backoff before retry number `attempt + 1`, without jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let nanos = self.base_delay.as_nanos() as f64 * factor;
        if !nanos.is_finite() || nanos >= self.max_delay.as_nanos() as f64 {
            return self.max_delay;
        }
        Duration::from_nanos(nanos.round() as u64)
    }

    fn validate(&self) -> Result<()> {
        if !(self.multiplier.is_finite() && self.multiplier >= 1.0) {
            return Err(Error::config("retry.multiplier must be >= 1"));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(Error::config("retry.jitter must be within 0.0..=1.0"));
        }
        Ok(())
    }
}

// ============================================================================
// Cache Config
// ============================================================================

/// Which cache backend to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// Process-local, lost on exit
    #[default]
    Memory,
    /// One file per entry under `directory`, survives restarts
    File,
    /// Caching disabled
    None,
}

/// Cache backend selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    /// Directory for the file backend
    pub directory: Option<PathBuf>,
    /// Entry limit for the memory backend
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            directory: None,
            max_entries: 10_000,
        }
    }
}

impl CacheConfig {
    pub fn memory(max_entries: usize) -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            directory: None,
            max_entries,
        }
    }

    pub fn file(directory: impl Into<PathBuf>) -> Self {
        Self {
            backend: CacheBackendKind::File,
            directory: Some(directory.into()),
            ..Self::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            backend: CacheBackendKind::None,
            ..Self::default()
        }
    }
}

// ============================================================================
// Serde Helpers
// ============================================================================

/// (De)serialize a `Duration` as integer milliseconds
pub(crate) mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// (De)serialize a `Duration` as integer seconds
pub(crate) mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
