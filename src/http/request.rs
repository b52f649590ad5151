//! Request description and local validation

use crate::cache::cache_key;
use crate::error::{Error, Result};
use crate::types::{Category, Encoding, Params, RecordLevel, SortBy, FILTER_PREFIX};

/// Largest page size the API accepts
pub const MAX_PAGE_SIZE: u32 = 100;

/// One logical GET against the API.
///
/// Immutable for the duration of an attempt; retries derive a new value
/// via [`RequestSpec::for_attempt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    /// Path relative to the base URL, e.g. `result` or `work/123`
    pub endpoint: String,
    /// Query parameters in insertion order; names may repeat
    pub params: Params,
    /// Negotiated response encoding
    pub encoding: Encoding,
    /// Zero-based attempt number
    pub attempt: u32,
}

impl RequestSpec {
    pub fn new(endpoint: impl Into<String>, params: Params, encoding: Encoding) -> Self {
        Self {
            endpoint: endpoint.into(),
            params,
            encoding,
            attempt: 0,
        }
    }

    /// Same request, numbered as attempt `attempt`
    #[must_use]
    pub fn for_attempt(&self, attempt: u32) -> Self {
        Self {
            attempt,
            ..self.clone()
        }
    }

    /// Cache key for this request (independent of the attempt number)
    pub fn cache_key(&self) -> String {
        cache_key(&self.endpoint, &self.params, self.encoding)
    }

    /// Values of every occurrence of `name`
    pub fn param_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.params
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Reject malformed requests before they reach the cache or the network
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint.trim_matches('/');
        if endpoint.is_empty() {
            return Err(Error::validation("endpoint must not be empty"));
        }
        if endpoint.contains("://") || endpoint.contains(['?', '#']) {
            return Err(Error::validation(format!(
                "endpoint '{}' must be a bare path relative to the base URL",
                self.endpoint
            )));
        }
        if endpoint.split('/').any(|segment| segment.is_empty() || segment == "..") {
            return Err(Error::validation(format!("malformed endpoint '{}'", self.endpoint)));
        }

        for (name, value) in &self.params {
            validate_param(name, value)?;
        }
        Ok(())
    }
}

fn validate_param(name: &str, value: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("parameter names must not be empty"));
    }
    match name {
        "category" => {
            value.parse::<Category>()?;
        }
        "n" => {
            let size: u32 = value
                .trim()
                .parse()
                .map_err(|_| Error::validation(format!("page size '{value}' is not a number")))?;
            if !(1..=MAX_PAGE_SIZE).contains(&size) {
                return Err(Error::validation(format!(
                    "page size must be between 1 and {MAX_PAGE_SIZE}, got {size}"
                )));
            }
        }
        "s" if value.trim().is_empty() => {
            return Err(Error::validation("cursor must not be empty"));
        }
        "sortby" => {
            value.parse::<SortBy>()?;
        }
        "reclevel" => {
            value.parse::<RecordLevel>()?;
        }
        "bulkHarvest" if !matches!(value.to_ascii_lowercase().as_str(), "true" | "false") => {
            return Err(Error::validation(format!("bulkHarvest must be true or false, got '{value}'")));
        }
        "facet" | "include" if value.trim().is_empty() => {
            return Err(Error::validation(format!("{name} must not be empty")));
        }
        _ if name.starts_with(FILTER_PREFIX) && name.len() == FILTER_PREFIX.len() => {
            return Err(Error::validation("filter parameter is missing a name"));
        }
        _ => {}
    }
    Ok(())
}
