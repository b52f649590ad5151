//! Retrying HTTP transport
//!
//! Ties the cache, the rate limiter and the HTTP client together:
//!
//! 1. validate the request (no permit consumed on failure)
//! 2. look up the cache; a hit returns without touching the network
//! 3. up to `max_retries + 1` attempts, each holding one limiter permit
//! 4. on success, compute the TTL and store the response
//!
//! Cache failures are logged and never fail a request.

use super::request::RequestSpec;
use super::sleeper::{Sleeper, TokioSleeper};
use crate::cache::{self, CacheBackend, TtlPolicy};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::rate_limit::RateLimiter;
use crate::types::{Encoding, JsonValue, Payload};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use reqwest::Client;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Longest error body kept in an error message
const MAX_ERROR_BODY: usize = 2048;

/// Snapshot of transport counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransportStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// HTTP requests actually sent
    pub network_attempts: u64,
    /// Backoff sleeps taken
    pub retries: u64,
    /// Requests that ended in an error after admission to the retry loop
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    network_attempts: AtomicU64,
    retries: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> TransportStats {
        TransportStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            network_attempts: self.network_attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Builder for [`Transport`]; collaborators not supplied are built from the config
pub struct TransportBuilder {
    config: ClientConfig,
    client: Option<Client>,
    cache: Option<Arc<dyn CacheBackend>>,
    limiter: Option<Arc<RateLimiter>>,
    sleeper: Option<Arc<dyn Sleeper>>,
}

impl TransportBuilder {
    /// Use an existing HTTP client (its timeout and user agent win)
    pub fn http_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Share a cache backend
    pub fn cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Share a rate limiter, e.g. across several transports
    pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Replace the backoff sleeper
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Validate the config and assemble the transport
    pub async fn build(self) -> Result<Transport> {
        let config = self.config;
        config.validate()?;

        let base_url = Url::parse(&config.base_url)?;
        let api_key = match &config.api_key {
            Some(key) => Some(auth_header(&config.api_key_header, key)?),
            None => None,
        };

        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .timeout(config.timeout)
                .user_agent(&config.user_agent)
                .build()?,
        };
        let cache = match self.cache {
            Some(cache) => cache,
            None => cache::from_config(&config.cache).await?,
        };
        let limiter = self
            .limiter
            .unwrap_or_else(|| Arc::new(RateLimiter::new(&config.rate_limit)));
        let sleeper = self.sleeper.unwrap_or_else(|| Arc::new(TokioSleeper));

        Ok(Transport {
            client,
            base_url,
            api_key,
            ttl: config.ttl.clone(),
            config,
            cache,
            limiter,
            sleeper,
            counters: Counters::default(),
        })
    }
}

fn auth_header(name: &str, key: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|e| Error::config(format!("invalid api_key_header '{name}': {e}")))?;
    let mut value = HeaderValue::from_str(key.trim())
        .map_err(|_| Error::config("api_key contains characters not allowed in a header"))?;
    value.set_sensitive(true);
    Ok((name, value))
}

/// HTTP transport with caching, rate limiting and retry
pub struct Transport {
    client: Client,
    config: ClientConfig,
    base_url: Url,
    api_key: Option<(HeaderName, HeaderValue)>,
    ttl: TtlPolicy,
    cache: Arc<dyn CacheBackend>,
    limiter: Arc<RateLimiter>,
    sleeper: Arc<dyn Sleeper>,
    counters: Counters,
}

impl Transport {
    /// Start building a transport from `config`
    pub fn builder(config: ClientConfig) -> TransportBuilder {
        TransportBuilder {
            config,
            client: None,
            cache: None,
            limiter: None,
            sleeper: None,
        }
    }

    /// Build a transport with every collaborator taken from `config`
    pub async fn from_config(config: ClientConfig) -> Result<Self> {
        Self::builder(config).build().await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<dyn CacheBackend> {
        &self.cache
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Current counter values
    pub fn stats(&self) -> TransportStats {
        self.counters.snapshot()
    }

    /// GET `endpoint` with `params` using the configured encoding
    pub async fn request(&self, endpoint: &str, params: &[(String, String)]) -> Result<Payload> {
        self.execute(RequestSpec::new(endpoint, params.to_vec(), self.config.encoding))
            .await
    }

    /// GET `endpoint` and require a JSON body
    pub async fn request_json(&self, endpoint: &str, params: &[(String, String)]) -> Result<JsonValue> {
        let spec = RequestSpec::new(endpoint, params.to_vec(), Encoding::Json);
        self.execute(spec).await?.into_json()
    }

    /// Run a fully described request through cache, limiter and retry loop
    pub async fn execute(&self, spec: RequestSpec) -> Result<Payload> {
        spec.validate()?;

        let key = spec.cache_key();
        if let Some(hit) = self.cache_lookup(&key).await {
            Counters::bump(&self.counters.cache_hits);
            debug!(endpoint = %spec.endpoint, "Cache hit");
            return Ok(hit);
        }
        Counters::bump(&self.counters.cache_misses);
        debug!(endpoint = %spec.endpoint, "Cache miss");

        let max_retries = self.config.retry.max_retries;
        let mut attempt = 0;
        loop {
            let current = spec.for_attempt(attempt);
            match self.attempt(&current).await {
                Ok(payload) => {
                    self.store(&key, &current, &payload).await;
                    return Ok(payload);
                }
                Err(error) if error.is_retryable() && attempt < max_retries => {
                    let delay = self.retry_delay(attempt, error.retry_after());
                    warn!(
                        endpoint = %current.endpoint,
                        attempt = attempt + 1,
                        max_attempts = max_retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Request failed, retrying"
                    );
                    Counters::bump(&self.counters.retries);
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    Counters::bump(&self.counters.failures);
                    debug!(
                        endpoint = %current.endpoint,
                        attempts = attempt + 1,
                        error = %error,
                        "Request failed"
                    );
                    return Err(error);
                }
            }
        }
    }

    /// Backoff before retry number `attempt + 1`: exponential, capped, plus
    /// up to `jitter` × delay of random extra
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let retry = &self.config.retry;
        let delay = retry.delay_for(attempt);
        if retry.jitter <= 0.0 || delay.is_zero() {
            return delay;
        }
        let factor = rand::thread_rng().gen_range(0.0..=retry.jitter);
        delay.saturating_add(delay.mul_f64(factor)).min(retry.max_delay)
    }

    /// Backoff lengthened to a server `Retry-After` hint, still capped
    fn retry_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let delay = self.calculate_backoff(attempt);
        match retry_after {
            Some(hint) if hint > delay => hint.min(self.config.retry.max_delay),
            _ => delay,
        }
    }

    async fn cache_lookup(&self, key: &str) -> Option<Payload> {
        match self.cache.get(key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(error = %e, "Cache lookup failed, treating as miss");
                None
            }
        }
    }

    async fn store(&self, key: &str, spec: &RequestSpec, payload: &Payload) {
        let ttl = self.ttl.ttl_for(&spec.endpoint, &spec.params, payload);
        debug!(endpoint = %spec.endpoint, ttl_secs = ttl.as_secs(), "Caching response");
        if let Err(e) = self.cache.set(key, payload, ttl).await {
            warn!(error = %e, "Cache store failed");
        }
    }

    /// One attempt: hold a permit for exactly the duration of the round trip
    async fn attempt(&self, spec: &RequestSpec) -> Result<Payload> {
        let _permit = self
            .limiter
            .acquire_permit(self.config.acquire_timeout)
            .await
            .ok_or_else(Error::local_rate_limit)?;
        Counters::bump(&self.counters.network_attempts);
        self.send(spec).await
    }

    async fn send(&self, spec: &RequestSpec) -> Result<Payload> {
        let url = self.endpoint_url(&spec.endpoint)?;
        debug!(url = %url, attempt = spec.attempt, "Sending request");

        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, spec.encoding.mime())
            .query(&spec.params);
        if let Some((name, value)) = &self.api_key {
            request = request.header(name.clone(), value.clone());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status.as_u16(), truncate(body), retry_after));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase);
        let body = response.text().await?;
        decode_body(content_type.as_deref(), body, spec.encoding)
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = endpoint.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .field("limiter", &self.limiter)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Decode a successful body by its declared content type, falling back to
/// the negotiated encoding when the server does not say
fn decode_body(content_type: Option<&str>, body: String, negotiated: Encoding) -> Result<Payload> {
    let is_json = match content_type {
        Some(ct) if ct.contains("json") => true,
        Some(ct) if ct.contains("xml") => false,
        _ => negotiated == Encoding::Json,
    };
    if is_json {
        serde_json::from_str(&body)
            .map(Payload::Json)
            .map_err(|e| Error::decode(format!("invalid JSON body: {e}")))
    } else {
        Ok(Payload::Xml(body))
    }
}

/// `Retry-After` as delta-seconds or an HTTP date
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let wait = at.with_timezone(&chrono::Utc) - chrono::Utc::now();
    Some(wait.to_std().unwrap_or(Duration::ZERO))
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}
