//! Response Cache Integration Tests
//!
//! A small recipes API wired with `response_cache` on reads and
//! `invalidate_on_success` on writes.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{request::Parts, Method, Request, StatusCode},
    middleware,
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tiered_cache::{
    cache::{CacheOptions, CacheService, MemoryConfig},
    middleware::{
        invalidate_on_success, response_cache, CacheKey, CachePolicy, InvalidationState,
        ResponseCacheState, X_CACHE_HEADER,
    },
};
use tower::ServiceExt;

// == Test App ==

#[derive(Clone, Default)]
struct Recipes {
    rows: Arc<Mutex<HashMap<String, String>>>,
    reads: Arc<AtomicUsize>,
}

async fn get_recipe(
    State(recipes): State<Recipes>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    recipes.reads.fetch_add(1, Ordering::SeqCst);
    let title = recipes.rows.lock().unwrap().get(&id).cloned();
    title
        .map(|title| Json(json!({"id": id, "title": title})))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn list_recipes(State(recipes): State<Recipes>) -> Json<Value> {
    recipes.reads.fetch_add(1, Ordering::SeqCst);
    let mut titles: Vec<String> = recipes.rows.lock().unwrap().values().cloned().collect();
    titles.sort();
    Json(json!({"titles": titles}))
}

async fn put_recipe(
    State(recipes): State<Recipes>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    let title = body["title"].as_str().unwrap_or_default().to_string();
    recipes.rows.lock().unwrap().insert(id, title);
    StatusCode::NO_CONTENT
}

fn app(cache: Arc<CacheService>, recipes: Recipes) -> Router {
    let reads = Router::new()
        .route("/recipes", get(list_recipes))
        .route("/recipes/:id", get(get_recipe))
        .route_layer(middleware::from_fn_with_state(
            ResponseCacheState::new(Arc::clone(&cache)),
            response_cache,
        ));

    let writes = Router::new().route(
        "/recipes/:id",
        axum::routing::put(put_recipe).layer(middleware::from_fn_with_state(
            InvalidationState::new(cache, ["api:/recipes*"]),
            invalidate_on_success,
        )),
    );

    reads.merge(writes).with_state(recipes)
}

async fn get_post(Path(id): Path<String>) -> Json<Value> {
    Json(json!({"post": id}))
}

/// Same `/:id` shape mounted under two prefixes.
fn nested_app(cache: Arc<CacheService>, recipes: Recipes) -> Router {
    let recipe_routes = Router::new()
        .route("/:id", get(get_recipe))
        .route_layer(middleware::from_fn_with_state(
            ResponseCacheState::new(Arc::clone(&cache)),
            response_cache,
        ));
    let blog_routes = Router::new()
        .route("/:id", get(get_post))
        .route_layer(middleware::from_fn_with_state(
            ResponseCacheState::new(cache),
            response_cache,
        ));

    Router::new()
        .nest("/recipes", recipe_routes)
        .nest("/blogs", blog_routes)
        .with_state(recipes)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

fn cache_header(response: &Response) -> &str {
    response
        .headers()
        .get(X_CACHE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

/// Polls until the detached write for `key` is visible.
async fn wait_until_cached(cache: &CacheService, key: &str) {
    let opts = CacheOptions::new().with_prefix("api");
    for _ in 0..100 {
        if cache.exists(key, &opts).await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never cached", key);
}

fn seeded() -> Recipes {
    let recipes = Recipes::default();
    recipes
        .rows
        .lock()
        .unwrap()
        .insert("1".to_string(), "Pho".to_string());
    recipes
}

// == Tests ==

#[tokio::test]
async fn test_second_read_is_served_from_cache() {
    let cache = Arc::new(CacheService::local_only(MemoryConfig::default()));
    let recipes = seeded();
    let app = app(Arc::clone(&cache), recipes.clone());

    let first = call(&app, Method::GET, "/recipes/1", None).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(cache_header(&first), "MISS");

    wait_until_cached(&cache, r#"/recipes/1:{}:{"id":"1"}"#).await;

    let second = call(&app, Method::GET, "/recipes/1", None).await;
    assert_eq!(cache_header(&second), "HIT");
    let bytes = axum::body::to_bytes(second.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["title"], "Pho");

    assert_eq!(recipes.reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_query_order_does_not_change_key() {
    let cache = Arc::new(CacheService::local_only(MemoryConfig::default()));
    let recipes = seeded();
    let app = app(Arc::clone(&cache), recipes.clone());

    call(&app, Method::GET, "/recipes?page=1&sort=title", None).await;
    wait_until_cached(&cache, r#"/recipes:{"page":"1","sort":"title"}:{}"#).await;

    let response = call(&app, Method::GET, "/recipes?sort=title&page=1", None).await;
    assert_eq!(cache_header(&response), "HIT");
    assert_eq!(recipes.reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_repeated_query_param_changes_key() {
    let cache = Arc::new(CacheService::local_only(MemoryConfig::default()));
    let recipes = seeded();
    let app = app(Arc::clone(&cache), recipes.clone());

    let first = call(&app, Method::GET, "/recipes?tag=a&tag=b", None).await;
    assert_eq!(cache_header(&first), "MISS");
    wait_until_cached(&cache, r#"/recipes:{"tag":["a","b"]}:{}"#).await;

    let narrower = call(&app, Method::GET, "/recipes?tag=b", None).await;
    assert_eq!(cache_header(&narrower), "MISS");
    assert_eq!(recipes.reads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_nested_routers_do_not_share_keys() {
    let cache = Arc::new(CacheService::local_only(MemoryConfig::default()));
    let recipes = seeded();
    let app = nested_app(Arc::clone(&cache), recipes.clone());

    let recipe = call(&app, Method::GET, "/recipes/1", None).await;
    assert_eq!(cache_header(&recipe), "MISS");
    wait_until_cached(&cache, r#"/recipes/1:{}:{"id":"1"}"#).await;

    let post = call(&app, Method::GET, "/blogs/1", None).await;
    assert_eq!(cache_header(&post), "MISS");
    let bytes = axum::body::to_bytes(post.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["post"], "1");
    wait_until_cached(&cache, r#"/blogs/1:{}:{"id":"1"}"#).await;

    let again = call(&app, Method::GET, "/recipes/1", None).await;
    assert_eq!(cache_header(&again), "HIT");
    let bytes = axum::body::to_bytes(again.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["title"], "Pho");

    // Full paths in the keys keep prefix invalidation working.
    assert_eq!(
        cache.keys("api:/recipes*").await,
        vec![r#"api:/recipes/1:{}:{"id":"1"}"#.to_string()]
    );
}

#[tokio::test]
async fn test_not_found_is_not_cached() {
    let cache = Arc::new(CacheService::local_only(MemoryConfig::default()));
    let recipes = seeded();
    let app = app(Arc::clone(&cache), recipes.clone());

    for _ in 0..2 {
        let response = call(&app, Method::GET, "/recipes/404", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(cache_header(&response), "MISS");
    }
    assert_eq!(recipes.reads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_write_invalidates_cached_reads() {
    let cache = Arc::new(CacheService::local_only(MemoryConfig::default()));
    let recipes = seeded();
    let app = app(Arc::clone(&cache), recipes.clone());

    call(&app, Method::GET, "/recipes/1", None).await;
    wait_until_cached(&cache, r#"/recipes/1:{}:{"id":"1"}"#).await;

    let put = call(&app, Method::PUT, "/recipes/1", Some(json!({"title": "Bun Bo"}))).await;
    assert_eq!(put.status(), StatusCode::NO_CONTENT);
    assert!(cache.keys("api:/recipes*").await.is_empty());

    let fresh = call(&app, Method::GET, "/recipes/1", None).await;
    assert_eq!(cache_header(&fresh), "MISS");
    let bytes = axum::body::to_bytes(fresh.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["title"], "Bun Bo");
}

#[tokio::test]
async fn test_custom_key_derivation() {
    let cache = Arc::new(CacheService::local_only(MemoryConfig::default()));
    let policy = CachePolicy::default()
        .with_ttl(30)
        .with_prefix("tenant")
        .with_key(CacheKey::Derive(Arc::new(|parts: &Parts| {
            let tenant = parts
                .headers
                .get("x-tenant")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("anon");
            format!("{}:{}", tenant, parts.uri.path())
        })));

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let app = Router::new()
        .route(
            "/me",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!({"me": true}))
                }
            }),
        )
        .route_layer(middleware::from_fn_with_state(
            ResponseCacheState::with_policy(Arc::clone(&cache), policy),
            response_cache,
        ));

    let request = |tenant: &str| {
        Request::builder()
            .uri("/me")
            .header("x-tenant", tenant)
            .body(Body::empty())
            .unwrap()
    };

    app.clone().oneshot(request("acme")).await.unwrap();
    let opts = CacheOptions::new().with_prefix("tenant");
    for _ in 0..100 {
        if cache.exists("acme:/me", &opts).await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let hit = app.clone().oneshot(request("acme")).await.unwrap();
    assert_eq!(cache_header(&hit), "HIT");
    let other = app.oneshot(request("globex")).await.unwrap();
    assert_eq!(cache_header(&other), "MISS");

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(cache.ttl("acme:/me", &opts).await <= 30);
}
