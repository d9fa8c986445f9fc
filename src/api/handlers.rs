//! API Handlers
//!
//! HTTP request handlers for the cache admin endpoints. Every handler goes
//! through the `CacheService` facade, so the remote/in-process choice is
//! invisible here.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

use crate::cache::CacheService;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, ExpireRequest, GetResponse, HealthResponse, KeysResponse,
    PatternDeleteResponse, PatternQuery, PrefixQuery, SetRequest, SetResponse, StatsResponse,
    TtlResponse,
};

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Two-tier cache facade
    pub cache: Arc<CacheService>,
}

impl AppState {
    /// Creates a new AppState around the given facade.
    pub fn new(cache: CacheService) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let options = req.options();
    state.cache.set(&req.key, &req.value, &options).await;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<PrefixQuery>,
) -> Result<Json<GetResponse>> {
    let value: Value = state
        .cache
        .get(&key, &query.options())
        .await
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<PrefixQuery>,
) -> Result<Json<DeleteResponse>> {
    if !state.cache.delete(&key, &query.options()).await {
        return Err(CacheError::NotFound(key));
    }
    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /ttl/:key
pub async fn ttl_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<PrefixQuery>,
) -> Json<TtlResponse> {
    let ttl = state.cache.ttl(&key, &query.options()).await;
    Json(TtlResponse { key, ttl })
}

/// Handler for POST /expire/:key
///
/// Resets the key's TTL to `seconds` from now.
pub async fn expire_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<ExpireRequest>,
) -> Result<Json<TtlResponse>> {
    let options = req.options();
    if !state.cache.extend_ttl(&key, req.seconds, &options).await {
        return Err(CacheError::NotFound(key));
    }
    let ttl = state.cache.ttl(&key, &options).await;
    Ok(Json(TtlResponse { key, ttl }))
}

/// Handler for GET /keys
pub async fn keys_handler(
    State(state): State<AppState>,
    Query(query): Query<PatternQuery>,
) -> Json<KeysResponse> {
    let mut keys = state.cache.keys(&query.pattern).await;
    keys.sort();
    Json(KeysResponse {
        pattern: query.pattern,
        keys,
    })
}

/// Handler for DELETE /keys
pub async fn delete_pattern_handler(
    State(state): State<AppState>,
    Query(query): Query<PatternQuery>,
) -> Json<PatternDeleteResponse> {
    let deleted = state.cache.delete_by_pattern(&query.pattern).await;
    Json(PatternDeleteResponse {
        pattern: query.pattern,
        deleted,
    })
}

/// Handler for DELETE /flush
pub async fn flush_handler(State(state): State<AppState>) -> Result<Json<Value>> {
    state.cache.flush_all().await?;
    Ok(Json(serde_json::json!({ "message": "Cache flushed" })))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats().await;
    Json(StatsResponse::new(stats, state.cache.metrics()))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        state.cache.has_remote(),
        state.cache.local_initialized(),
    ))
}
