//! Error types for the catalog client
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Where a rate-limit failure originated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitSource {
    /// The server answered 429
    Server,
    /// The local limiter could not admit the request before its deadline
    Local,
}

impl fmt::Display for RateLimitSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => f.write_str("server"),
            Self::Local => f.write_str("local limiter"),
        }
    }
}

/// The main error type for the catalog client
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Request Errors (never retried)
    // ============================================================================
    #[error("Invalid request: {message}")]
    Validation { message: String },

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Not authorized: {message}")]
    Authorization { message: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    // ============================================================================
    // Transient Errors (retried)
    // ============================================================================
    #[error("Rate limited by {origin}{}", fmt_retry_after(.retry_after))]
    RateLimited {
        retry_after: Option<Duration>,
        origin: RateLimitSource,
    },

    #[error("API error {status}: {body}")]
    TransientApi { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    // ============================================================================
    // Local Errors
    // ============================================================================
    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

fn fmt_retry_after(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(", retry after {}s", d.as_secs()),
        None => String::new(),
    }
}

/// Flat classification of an [`Error`], used for retry decisions and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Authorization,
    NotFound,
    RateLimited,
    TransientApi,
    Network,
    Cache,
    Decode,
    Config,
    Other,
}

impl ErrorKind {
    /// Whether failures of this kind are worth another attempt
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::TransientApi | Self::Network)
    }
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a cache error
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Local admission timed out
    pub fn local_rate_limit() -> Self {
        Self::RateLimited {
            retry_after: None,
            origin: RateLimitSource::Local,
        }
    }

    /// Map an unsuccessful HTTP status and body to a typed error
    pub fn from_status(status: u16, body: impl Into<String>, retry_after: Option<Duration>) -> Self {
        let body = body.into();
        match status {
            400 => Self::Validation { message: body },
            401 => Self::Authentication { message: body },
            403 => Self::Authorization { message: body },
            404 => Self::NotFound { resource: body },
            429 => Self::RateLimited {
                retry_after,
                origin: RateLimitSource::Server,
            },
            _ => Self::TransientApi { status, body },
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Authentication { .. } => ErrorKind::Authentication,
            Error::Authorization { .. } => ErrorKind::Authorization,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::RateLimited { .. } => ErrorKind::RateLimited,
            Error::TransientApi { .. } => ErrorKind::TransientApi,
            Error::Network(_) => ErrorKind::Network,
            Error::Cache { .. } => ErrorKind::Cache,
            Error::Decode { .. } | Error::Json(_) => ErrorKind::Decode,
            Error::Config { .. } | Error::Yaml(_) | Error::InvalidUrl(_) => ErrorKind::Config,
            Error::Io(_) | Error::Other(_) | Error::Anyhow(_) => ErrorKind::Other,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Server-provided retry hint, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias for the catalog client
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
