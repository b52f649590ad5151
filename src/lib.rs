// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Catalog Client
//!
//! A rate-limited, caching, retrying client for cursor-paginated catalog
//! search APIs.
//!
//! ## Features
//!
//! - **Rate Limiting**: token bucket plus a concurrency ceiling, jittered waits
//! - **Caching**: in-memory or durable file cache with per-response TTLs
//! - **Retries**: exponential backoff with jitter for transient failures
//! - **Pagination**: opaque per-category cursors, single and multi-category
//! - **Blocking API**: the same engine behind plain iterators
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use catalog_client::{Category, ClientConfig, SearchClient, SearchQuery};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> catalog_client::Result<()> {
//!     let config = ClientConfig::default().with_env_overrides();
//!     let client = SearchClient::from_config(config).await?;
//!
//!     let query = SearchQuery::new([Category::Book, Category::Image]).text("floods");
//!     let mut pages = client.iterate_pages_by_category(query)?;
//!     while let Some((category, page)) = pages.next().await {
//!         println!("{category}: {} records", page.records().count());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  SearchClient: first_page, iterate_pages, iterate_records,   │
//! │                iterate_pages_by_category                     │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┴───────────────────────────────┐
//! │  Transport: validate → cache → permit → GET → retry → store  │
//! └──────────┬───────────────────┬───────────────────┬───────────┘
//!            │                   │                   │
//!     ┌──────┴──────┐     ┌──────┴──────┐     ┌──────┴──────┐
//!     │ RateLimiter │     │ CacheBackend│     │   reqwest   │
//!     │ TokenBucket │     │  TtlPolicy  │     │             │
//!     └─────────────┘     └─────────────┘     └─────────────┘
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the client
pub mod error;

/// Common types and type aliases
pub mod types;

/// Client configuration
pub mod config;

/// Token bucket and rate limiter
pub mod rate_limit;

/// Response caching and TTL policy
pub mod cache;

/// Retrying HTTP transport
pub mod http;

/// Cursor-based pagination and search entry points
pub mod pagination;

/// Blocking wrappers
pub mod blocking;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use cache::{CacheBackend, FileCache, MemoryCache, TtlPolicy};
pub use config::{CacheConfig, ClientConfig, RetryConfig};
pub use error::{Error, ErrorKind, Result};
pub use http::{RequestSpec, Sleeper, Transport, TransportStats};
pub use pagination::{Record, SearchClient, SearchPage, SearchQuery};
pub use rate_limit::{RateLimiter, RateLimiterConfig, TokenBucket};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
