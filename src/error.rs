//! Error types for the cache server
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Errors surfaced to callers of the cache and the HTTP gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key is absent or its entry has expired
    #[error("Key not found: {0}")]
    NotFound(String),

    /// TTL must be a positive number of seconds
    #[error("Invalid TTL: {0} (must be a positive number of seconds)")]
    InvalidTtl(i64),

    /// Malformed request rejected before reaching the store
    #[error("Invalid request: {0}")]
    Validation(String),
}

impl CacheError {
    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            CacheError::NotFound(_) => "not_found",
            CacheError::InvalidTtl(_) => "invalid_ttl",
            CacheError::Validation(_) => "validation_error",
        }
    }

    /// HTTP status used by the gateway for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidTtl(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse::new(self.to_string(), self.code()));
        (self.status(), body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache server.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_statuses_are_distinct() {
        let not_found = CacheError::NotFound("k".to_string()).status();
        let invalid_ttl = CacheError::InvalidTtl(-1).status();
        let validation = CacheError::Validation("missing key".to_string()).status();

        assert_eq!(not_found, StatusCode::NOT_FOUND);
        assert_eq!(invalid_ttl, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(validation, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CacheError::NotFound("k".into()).code(), "not_found");
        assert_eq!(CacheError::InvalidTtl(0).code(), "invalid_ttl");
        assert_eq!(CacheError::Validation("x".into()).code(), "validation_error");
    }

    #[test]
    fn test_invalid_ttl_message_mentions_value() {
        let err = CacheError::InvalidTtl(-5);
        assert!(err.to_string().contains("-5"));
    }
}
