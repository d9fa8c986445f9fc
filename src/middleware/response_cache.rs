//! Response caching for read routes
//!
//! `response_cache` serves GET/HEAD requests from the cache when it can and
//! stores successful JSON responses when it cannot. `invalidate_on_success`
//! is its counterpart for mutating routes.
//!
//! # Example
//!
//! ```ignore
//! use axum::{middleware, routing::{get, put}, Router};
//! use tiered_cache::middleware::{
//!     invalidate_on_success, response_cache, InvalidationState, ResponseCacheState,
//! };
//!
//! let reads = ResponseCacheState::new(cache.clone());
//! let writes = InvalidationState::new(cache.clone(), ["api:/recipes*"]);
//!
//! let app = Router::new()
//!     .route("/recipes/:id", get(get_recipe))
//!     .route_layer(middleware::from_fn_with_state(reads, response_cache))
//!     .route("/recipes/:id", put(update_recipe).layer(
//!         middleware::from_fn_with_state(writes, invalidate_on_success),
//!     ));
//! ```
//!
//! Attach with `route_layer` (or on the method router) so route params are
//! already matched when the key is derived.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{OriginalUri, RawPathParams, Request, State},
    http::{header, request::Parts, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::cache::{CacheOptions, CacheService};
use crate::error::CacheError;

// == Constants ==
/// Response header reporting whether the body came from the cache
pub const X_CACHE_HEADER: &str = "x-cache";

/// Default TTL for cached responses (1 hour)
pub const DEFAULT_RESPONSE_TTL: u64 = 3600;

/// Default namespace for cached responses
pub const DEFAULT_RESPONSE_PREFIX: &str = "api";

// == Policy ==
/// How the cache key for a request is chosen.
#[derive(Clone, Default)]
pub enum CacheKey {
    /// `{path}:{query_json}:{params_json}` with sorted maps
    #[default]
    Derived,
    /// The same key for every request on the route
    Static(String),
    /// Caller-supplied derivation from the request head
    Derive(Arc<dyn Fn(&Parts) -> String + Send + Sync>),
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Derived => f.write_str("Derived"),
            Self::Static(key) => f.debug_tuple("Static").field(key).finish(),
            Self::Derive(_) => f.write_str("Derive(..)"),
        }
    }
}

/// TTL, namespace and key strategy for one cached route group.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub ttl: u64,
    pub prefix: String,
    pub key: CacheKey,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_RESPONSE_TTL,
            prefix: DEFAULT_RESPONSE_PREFIX.to_string(),
            key: CacheKey::Derived,
        }
    }
}

impl CachePolicy {
    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_key(mut self, key: CacheKey) -> Self {
        self.key = key;
        self
    }

    fn options(&self) -> CacheOptions {
        CacheOptions {
            ttl: Some(self.ttl),
            prefix: Some(self.prefix.clone()),
        }
    }
}

// == State ==
/// Shared state for `response_cache`.
#[derive(Debug, Clone)]
pub struct ResponseCacheState {
    pub cache: Arc<CacheService>,
    pub policy: CachePolicy,
}

impl ResponseCacheState {
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self::with_policy(cache, CachePolicy::default())
    }

    pub fn with_policy(cache: Arc<CacheService>, policy: CachePolicy) -> Self {
        Self { cache, policy }
    }
}

/// Shared state for `invalidate_on_success`.
#[derive(Debug, Clone)]
pub struct InvalidationState {
    pub cache: Arc<CacheService>,
    pub patterns: Arc<[String]>,
}

impl InvalidationState {
    pub fn new<I, S>(cache: Arc<CacheService>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cache,
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }
}

// == Middleware ==
/// Serves cached JSON for GET/HEAD requests and caches fresh 2xx JSON responses.
///
/// Hits skip the handler and carry `x-cache: HIT`. Misses run the handler,
/// carry `x-cache: MISS`, and write to the cache from a detached task, so a
/// slow or failing cache never delays or fails the request.
pub async fn response_cache(
    State(state): State<ResponseCacheState>,
    params: Option<RawPathParams>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    if !is_cacheable_method(&method) {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let key = match &state.policy.key {
        CacheKey::Derived => {
            // Nested routers see a stripped path; key on what the client sent.
            let uri = parts
                .extensions
                .get::<OriginalUri>()
                .map(|OriginalUri(uri)| uri)
                .unwrap_or(&parts.uri);
            derive_key(uri.path(), uri.query(), params.as_ref())
        }
        CacheKey::Static(key) => key.clone(),
        CacheKey::Derive(derive) => derive(&parts),
    };
    let options = state.policy.options();

    if let Some(cached) = state.cache.get::<Value>(&key, &options).await {
        debug!(key = %key, "response cache hit");
        return with_cache_header((StatusCode::OK, Json(cached)).into_response(), "HIT");
    }

    let response = next.run(Request::from_parts(parts, body)).await;
    if method != Method::GET || !response.status().is_success() || !is_json(&response) {
        return with_cache_header(response, "MISS");
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(key = %key, error = %err, "Failed to buffer response body");
            return CacheError::Internal(format!("Failed to read response body: {}", err))
                .into_response();
        }
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => {
            let cache = Arc::clone(&state.cache);
            tokio::spawn(async move {
                cache.set(&key, &value, &options).await;
                debug!(key = %key, "response cached");
            });
        }
        Err(err) => debug!(key = %key, error = %err, "Response body is not JSON; not caching"),
    }

    with_cache_header(Response::from_parts(parts, Body::from(bytes)), "MISS")
}

/// Deletes every configured pattern after the wrapped handler returns 2xx.
pub async fn invalidate_on_success(
    State(state): State<InvalidationState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if response.status().is_success() {
        for pattern in state.patterns.iter() {
            let removed = state.cache.delete_by_pattern(pattern).await;
            debug!(pattern = %pattern, removed, "invalidated after write");
        }
    }
    response
}

// == Helpers ==
fn is_cacheable_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD)
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

fn with_cache_header(mut response: Response, status: &'static str) -> Response {
    response
        .headers_mut()
        .insert(X_CACHE_HEADER, HeaderValue::from_static(status));
    response
}

/// Builds `{path}:{query_json}:{params_json}`; map keys are sorted so the
/// result does not depend on parameter order.
///
/// A query parameter given once serializes as a string, a repeated one as an
/// array of its values in request order.
pub fn derive_key(path: &str, raw_query: Option<&str>, params: Option<&RawPathParams>) -> String {
    let query_json = query_json(raw_query.unwrap_or_default());

    let params: BTreeMap<&str, &str> = params
        .map(|params| params.iter().collect())
        .unwrap_or_default();
    let params_json = serde_json::to_string(&params).unwrap_or_default();

    format!("{}:{}:{}", path, query_json, params_json)
}

fn query_json(raw_query: &str) -> String {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in form_urlencoded::parse(raw_query.as_bytes()) {
        grouped
            .entry(name.into_owned())
            .or_default()
            .push(value.into_owned());
    }

    let query: BTreeMap<String, Value> = grouped
        .into_iter()
        .map(|(name, mut values)| {
            let value = if values.len() == 1 {
                Value::String(values.remove(0))
            } else {
                Value::from(values)
            };
            (name, value)
        })
        .collect();
    serde_json::to_string(&query).unwrap_or_default()
}
