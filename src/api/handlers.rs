//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use tracing::debug;

use crate::cache::CacheHandle;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, HealthResponse, KeyQuery, SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// The cache is created by the entry point and handed in here; handlers
/// never reach for global state.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe cache and its change feed
    pub cache: Arc<CacheHandle>,
    /// TTL in seconds used when a set request omits one
    pub default_ttl: u64,
}

impl AppState {
    /// Creates a new AppState around an existing cache.
    pub fn new(cache: Arc<CacheHandle>, default_ttl: u64) -> Self {
        Self { cache, default_ttl }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(CacheHandle::with_capacity(config.capacity)),
            config.default_ttl,
        )
    }
}

/// Handler for POST /set
///
/// Stores a key-value pair. Malformed bodies are validation errors; a
/// non-positive TTL is reported by the store as `InvalidTtl`.
pub async fn set_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SetRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SetResponse>)> {
    let Json(req) = payload.map_err(|rejection| CacheError::Validation(rejection.body_text()))?;
    req.validate()?;

    let ttl = req
        .ttl
        .unwrap_or_else(|| i64::try_from(state.default_ttl).unwrap_or(i64::MAX));
    let expires_at = state.cache.set(req.key.clone(), req.value, ttl).await?;
    debug!(key = %req.key, ttl, "Set");

    Ok((
        StatusCode::CREATED,
        Json(SetResponse::new(req.key, expires_at)),
    ))
}

/// Handler for GET /get?key=
///
/// Returns the raw value as a plain-text body.
pub async fn get_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<KeyQuery>, QueryRejection>,
) -> Result<String> {
    let key = parse_key(query)?;
    let lookup = state.cache.get(&key).await?;
    Ok(lookup.value)
}

/// Handler for GET /delete?key= (and DELETE /delete?key=)
///
/// Succeeds whether or not the key existed.
pub async fn delete_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<KeyQuery>, QueryRejection>,
) -> Result<Json<DeleteResponse>> {
    let key = parse_key(query)?;
    let deleted = state.cache.delete(&key).await;
    Ok(Json(DeleteResponse::new(key, deleted)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats().await;
    let capacity = state.cache.capacity().await;
    let subscribers = state.cache.feed().subscriber_count();

    Json(StatsResponse::new(&stats, capacity, subscribers))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

fn parse_key(query: std::result::Result<Query<KeyQuery>, QueryRejection>) -> Result<String> {
    let Query(query) = query.map_err(|rejection| CacheError::Validation(rejection.body_text()))?;
    query.into_key()
}
