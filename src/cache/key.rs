//! Cache key derivation
//!
//! Keys are the SHA-256 of endpoint, negotiated encoding, and the sorted,
//! URL-encoded parameter list. Credential parameters never reach the hash.

use crate::types::Encoding;
use sha2::{Digest, Sha256};

/// Parameter names that carry credentials and are excluded from keys
pub const CREDENTIAL_PARAMS: &[&str] = &["key", "wskey", "api_key", "apikey", "x-api-key"];

/// Whether a parameter name carries credentials
pub fn is_credential(name: &str) -> bool {
    CREDENTIAL_PARAMS
        .iter()
        .any(|c| c.eq_ignore_ascii_case(name))
}

/// Derive the cache key for a request
pub fn cache_key(endpoint: &str, params: &[(String, String)], encoding: Encoding) -> String {
    let mut pairs: Vec<(&str, &str)> = params
        .iter()
        .filter(|(name, _)| !is_credential(name))
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    pairs.sort_unstable();

    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();

    let mut hasher = Sha256::new();
    hasher.update(endpoint.trim_matches('/').as_bytes());
    hasher.update(b"\n");
    hasher.update(encoding.mime().as_bytes());
    hasher.update(b"\n");
    hasher.update(query.as_bytes());
    hex::encode(hasher.finalize())
}
