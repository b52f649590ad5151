//! HTTP transport module
//!
//! Provides the retrying transport every API call goes through.
//!
//! # Features
//!
//! - **Caching**: responses stored with a per-response TTL
//! - **Rate Limiting**: one limiter permit per attempt, released on every path
//! - **Retries**: exponential backoff with jitter, honoring `Retry-After`
//! - **Error Mapping**: HTTP statuses mapped onto [`crate::Error`] kinds

mod request;
mod sleeper;
mod transport;

pub use request::{RequestSpec, MAX_PAGE_SIZE};
pub use sleeper::{RecordingSleeper, Sleeper, TokioSleeper};
pub use transport::{Transport, TransportBuilder, TransportStats};
