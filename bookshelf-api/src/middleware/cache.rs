//! Detail-read response caching with invalidation on writes.
//!
//! A resource registers its detail operations in an [`OperationTable`]
//! (`retrieve`, `update`, `partial_update`, ...). [`DetailCache::bind`] then
//! layers middleware onto the named operations:
//!
//! - the read operation gets the read interceptor: a hit is served from the
//!   cache without running the handler; a `200` miss is stored for the TTL.
//! - each write operation gets the invalidation binder: the key a `GET` on
//!   the same path would use is deleted, then the write runs.
//!
//! # Ordering
//!
//! Invalidation happens before the mutation. A read that lands between the
//! delete and the mutation repopulates the cache with the old record, which
//! then stays until the next write or TTL expiry.
//!
//! An optional [`WriteGuard`] runs before invalidation; a write it rejects
//! neither invalidates nor reaches the handler.

use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    async_trait,
    body::{to_bytes, Body, Bytes, HttpBody},
    extract::{OriginalUri, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::MethodRouter,
};
use bookshelf_core::{BookshelfResult, CacheError};
use bookshelf_storage::{build_backend, CacheKey, CacheKeyDeriver, ResponseCacheStore};

use crate::config::CacheSettings;
use crate::error::{ApiError, ApiResult};

/// Response header reporting whether a read was served from the cache.
pub static X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Upper bound for request bodies buffered by a write guard.
pub const MAX_WRITE_BODY_BYTES: usize = 1024 * 1024;

/// Conventional operation names.
pub const RETRIEVE: &str = "retrieve";
pub const UPDATE: &str = "update";
pub const PARTIAL_UPDATE: &str = "partial_update";
pub const DESTROY: &str = "destroy";

// ============================================================================
// OPERATION TABLE
// ============================================================================

/// Named operations served on a single resource path.
pub struct OperationTable<S> {
    operations: Vec<(String, MethodRouter<S>)>,
}

impl<S> OperationTable<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    /// Register an operation under `name`.
    pub fn register(mut self, name: impl Into<String>, route: MethodRouter<S>) -> Self {
        self.operations.push((name.into(), route));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.iter().any(|(n, _)| n == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operations.iter().map(|(n, _)| n.as_str())
    }

    /// Replace the operation `name` with `f(operation)`.
    pub fn wrap<F>(mut self, name: &str, f: F) -> BookshelfResult<Self>
    where
        F: FnOnce(MethodRouter<S>) -> MethodRouter<S>,
    {
        let index = self
            .operations
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| CacheError::OperationNotFound {
                operation: name.to_string(),
            })?;
        let (name, route) = self.operations.remove(index);
        self.operations.insert(index, (name, f(route)));
        Ok(self)
    }

    /// Merge every operation into one method router.
    ///
    /// Operations must handle disjoint HTTP methods.
    pub fn into_method_router(self) -> MethodRouter<S> {
        self.operations
            .into_iter()
            .fold(MethodRouter::new(), |merged, (_, route)| merged.merge(route))
    }
}

impl<S> Default for OperationTable<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// BINDING
// ============================================================================

/// Validates a write request before any invalidation happens.
#[async_trait]
pub trait WriteGuard: Send + Sync {
    /// Inspect the buffered request. An error is returned to the client as is.
    async fn check(&self, parts: &mut Parts, body: &Bytes) -> ApiResult<()>;
}

/// Which operations of a table to cache and which invalidate.
#[derive(Clone, Default)]
pub struct CacheBinding {
    read: Option<String>,
    writes: Vec<String>,
    guard: Option<Arc<dyn WriteGuard>>,
}

impl CacheBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache the responses of the read operation `name`.
    pub fn cache_read(mut self, name: impl Into<String>) -> Self {
        self.read = Some(name.into());
        self
    }

    /// Invalidate the cached read before each of these operations.
    pub fn invalidate_on<I, T>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.writes.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_write_guard(mut self, guard: Arc<dyn WriteGuard>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Cache `retrieve`, invalidate on `update` and `partial_update`.
    pub fn detail_with_reset_on_update() -> Self {
        Self::new()
            .cache_read(RETRIEVE)
            .invalidate_on([UPDATE, PARTIAL_UPDATE])
    }

    fn operation_names(&self) -> impl Iterator<Item = &String> {
        self.read.iter().chain(self.writes.iter())
    }
}

// ============================================================================
// DETAIL CACHE
// ============================================================================

/// Shared cache wiring: one store, one key deriver, one TTL.
///
/// Cloning is cheap; all clones share the same backend.
#[derive(Debug, Clone)]
pub struct DetailCache {
    store: ResponseCacheStore,
    deriver: Arc<CacheKeyDeriver>,
    ttl: Duration,
}

impl DetailCache {
    pub fn new(store: ResponseCacheStore, deriver: CacheKeyDeriver, ttl: Duration) -> Self {
        Self {
            store,
            deriver: Arc::new(deriver),
            ttl,
        }
    }

    /// Build the cache described by `settings`.
    pub fn from_settings(settings: &CacheSettings) -> BookshelfResult<Self> {
        let backend = build_backend(&settings.backend, settings.max_entries)?;
        let deriver = CacheKeyDeriver::new(settings.key_prefix.clone())
            .with_vary_headers(&settings.vary_headers);
        Ok(Self::new(ResponseCacheStore::new(backend), deriver, settings.ttl))
    }

    pub fn store(&self) -> &ResponseCacheStore {
        &self.store
    }

    pub fn deriver(&self) -> &CacheKeyDeriver {
        &self.deriver
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Key under which a `GET` of `path` with `headers` is cached.
    pub fn read_key(&self, path: &str, headers: &HeaderMap) -> CacheKey {
        let vary = self.deriver.vary_context(|name| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        });
        self.deriver.derive("GET", path, &vary)
    }

    /// Read key for any request on the same path, whatever its method.
    ///
    /// Uses the path as the client sent it, before any nesting prefix was
    /// stripped.
    fn read_key_for(&self, request: &Request) -> CacheKey {
        let path = request
            .extensions()
            .get::<OriginalUri>()
            .map(|OriginalUri(uri)| uri.path())
            .unwrap_or_else(|| request.uri().path());
        self.read_key(path, request.headers())
    }

    /// Layer the read interceptor and invalidation binder onto `table`.
    ///
    /// Every operation named by `binding` must be registered; otherwise
    /// [`CacheError::OperationNotFound`] is returned and nothing is wrapped.
    pub fn bind<S>(
        &self,
        table: OperationTable<S>,
        binding: &CacheBinding,
    ) -> BookshelfResult<OperationTable<S>>
    where
        S: Clone + Send + Sync + 'static,
    {
        if let Some(missing) = binding.operation_names().find(|name| !table.contains(name)) {
            return Err(CacheError::OperationNotFound {
                operation: missing.clone(),
            }
            .into());
        }

        let mut table = table;
        for name in &binding.writes {
            let state = InvalidationState {
                cache: self.clone(),
                guard: binding.guard.clone(),
            };
            table = table.wrap(name, |route| {
                route.layer(from_fn_with_state(state, invalidate_before_write))
            })?;
        }
        if let Some(name) = &binding.read {
            let cache = self.clone();
            table = table.wrap(name, |route| {
                route.layer(from_fn_with_state(cache, serve_cached_read))
            })?;
        }

        tracing::debug!(
            read = ?binding.read,
            writes = ?binding.writes,
            ttl_secs = self.ttl.as_secs(),
            "Response cache bound to operations"
        );
        Ok(table)
    }

    fn hit_response(&self, body: Vec<u8>) -> Response {
        let mut response = Response::new(Body::from(body));
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.mark(response.headers_mut(), "HIT");
        response
    }

    fn mark(&self, headers: &mut HeaderMap, status: &'static str) {
        headers.insert(X_CACHE.clone(), HeaderValue::from_static(status));
        if let Ok(value) = HeaderValue::try_from(format!("max-age={}", self.ttl.as_secs())) {
            headers.insert(header::CACHE_CONTROL, value);
        }
    }
}

// ============================================================================
// MIDDLEWARE
// ============================================================================

/// Read interceptor.
///
/// Hit: the stored body is returned with `200` and the handler is skipped.
/// Miss: the handler runs and a `200` response is stored before returning.
/// Backend failures fail the read with `500`.
async fn serve_cached_read(
    State(cache): State<DetailCache>,
    request: Request,
    next: Next,
) -> Response {
    let key = cache.read_key_for(&request);

    match cache.store.get(&key).await {
        Ok(Some(body)) => {
            tracing::debug!(key = %key, "Serving read from response cache");
            return cache.hit_response(body);
        }
        Ok(None) => {}
        Err(err) => return ApiError::from(err).into_response(),
    }

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(key = %key, error = %err, "Failed to buffer response for caching");
            return ApiError::internal_error("Failed to read response body").into_response();
        }
    };

    if let Err(err) = cache.store.set(&key, bytes.to_vec(), cache.ttl).await {
        return ApiError::from(err).into_response();
    }
    tracing::debug!(key = %key, ttl_secs = cache.ttl.as_secs(), "Stored read in response cache");

    cache.mark(&mut parts.headers, "MISS");
    Response::from_parts(parts, Body::from(bytes))
}

#[derive(Clone)]
struct InvalidationState {
    cache: DetailCache,
    guard: Option<Arc<dyn WriteGuard>>,
}

/// Invalidation binder.
///
/// Deletes the cached read for the request path, then runs the write.
/// Backend failures are logged and never block the write.
async fn invalidate_before_write(
    State(state): State<InvalidationState>,
    request: Request,
    next: Next,
) -> Response {
    let request = match &state.guard {
        Some(guard) => match guard_request(guard.as_ref(), request).await {
            Ok(request) => request,
            Err(err) => return err.into_response(),
        },
        None => request,
    };

    let key = state.cache.read_key_for(&request);
    match state.cache.store.delete(&key).await {
        Ok(existed) => tracing::debug!(key = %key, existed, "Invalidated cached read"),
        Err(err) => tracing::warn!(
            key = %key,
            error = %err,
            "Cache invalidation failed, proceeding with write"
        ),
    }

    next.run(request).await
}

async fn guard_request(guard: &dyn WriteGuard, request: Request) -> ApiResult<Request> {
    let (mut parts, body) = request.into_parts();
    let bytes = read_write_body(body, MAX_WRITE_BODY_BYTES).await.map_err(|err| {
        tracing::debug!(path = %parts.uri.path(), error = %err, "Write body not readable");
        err
    })?;

    guard.check(&mut parts, &bytes).await.map_err(|err| {
        tracing::debug!(path = %parts.uri.path(), error = %err, "Write rejected before invalidation");
        err
    })?;

    Ok(Request::from_parts(parts, Body::from(bytes)))
}

/// Buffer a write body of at most `limit` bytes.
///
/// A declared length over the limit is refused before reading. A streamed
/// body is refused as soon as it passes the limit.
async fn read_write_body(mut body: Body, limit: usize) -> ApiResult<Bytes> {
    if body.size_hint().lower() > limit as u64 {
        return Err(ApiError::payload_too_large(limit));
    }

    let mut buffer = Vec::new();
    while let Some(frame) = poll_fn(|cx| Pin::new(&mut body).poll_frame(cx)).await {
        let frame = frame
            .map_err(|e| ApiError::invalid_input(format!("Failed to read request body: {}", e)))?;
        if let Ok(data) = frame.into_data() {
            if buffer.len() + data.len() > limit {
                return Err(ApiError::payload_too_large(limit));
            }
            buffer.extend_from_slice(&data);
        }
    }
    Ok(Bytes::from(buffer))
}
