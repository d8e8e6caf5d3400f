//! Test application wiring and request helpers.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::Request,
    http::{header, HeaderMap, Method, StatusCode},
    Router,
};
use bookshelf_api::{create_api_router, ApiConfig, AppState, DetailCache, EnrichmentSource, X_CACHE};
use bookshelf_storage::{
    BookRepository, CacheKeyDeriver, DummyCacheBackend, MemoryCacheBackend, ResponseCacheStore,
};
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_TTL: Duration = Duration::from_secs(300);

pub fn memory_cache() -> DetailCache {
    DetailCache::new(
        ResponseCacheStore::new(Arc::new(MemoryCacheBackend::default())),
        CacheKeyDeriver::default(),
        TEST_TTL,
    )
}

pub fn dummy_cache() -> DetailCache {
    DetailCache::new(
        ResponseCacheStore::new(Arc::new(DummyCacheBackend::new())),
        CacheKeyDeriver::default(),
        TEST_TTL,
    )
}

pub fn test_router(
    repository: Arc<dyn BookRepository>,
    enrichment: Arc<dyn EnrichmentSource>,
    cache: DetailCache,
) -> Router {
    let state = AppState::new(repository, enrichment, cache);
    create_api_router(state, &ApiConfig::default()).expect("Failed to build test router")
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("Response body is not JSON")
    }

    pub fn cache_status(&self) -> Option<&str> {
        self.headers.get(&X_CACHE).and_then(|v| v.to_str().ok())
    }
}

pub async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("Router is infallible");
    let (parts, body) = response.into_parts();
    let body = to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read response body");

    TestResponse {
        status: parts.status,
        headers: parts.headers,
        body,
    }
}

pub async fn get(router: &Router, uri: &str) -> TestResponse {
    send(router, Method::GET, uri, None).await
}
