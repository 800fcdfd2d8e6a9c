//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;

use crate::cache::{MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::error::{CacheError, Result};

/// Request body for the SET operation (POST /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: The value to store
/// - `ttl`: TTL in seconds; the server default applies when omitted or null
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: String,
    /// TTL in seconds. Sign is checked by the store, not here.
    #[serde(default)]
    pub ttl: Option<i64>,
}

impl SetRequest {
    /// Validates the request shape.
    ///
    /// TTL range is deliberately left to the store, which answers `InvalidTtl`.
    pub fn validate(&self) -> Result<()> {
        validate_key(&self.key)?;
        if self.value.len() > MAX_VALUE_SIZE {
            return Err(CacheError::Validation(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }
        Ok(())
    }
}

/// Query string for GET /get and GET /delete (`?key=...`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyQuery {
    #[serde(default)]
    pub key: Option<String>,
}

impl KeyQuery {
    /// Returns the validated key, or a validation error if it is missing.
    pub fn into_key(self) -> Result<String> {
        let key = self
            .key
            .ok_or_else(|| CacheError::Validation("Missing 'key' query parameter".to_string()))?;
        validate_key(&key)?;
        Ok(key)
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::Validation("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::Validation(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
