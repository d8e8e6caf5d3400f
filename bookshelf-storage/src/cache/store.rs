//! Response cache store: typed keys over a shared byte backend.

use std::sync::Arc;
use std::time::Duration;

use bookshelf_core::BookshelfResult;

use super::key::CacheKey;
use super::traits::{CacheBackend, CacheStats};

/// Thin wrapper around a [`CacheBackend`] that speaks [`CacheKey`]s.
///
/// Adds no locking: concurrent misses on the same key both `set`, and the
/// last writer wins.
#[derive(Clone)]
pub struct ResponseCacheStore {
    backend: Arc<dyn CacheBackend>,
}

impl ResponseCacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Get a reference to the cache backend.
    pub fn backend(&self) -> &dyn CacheBackend {
        self.backend.as_ref()
    }

    pub async fn get(&self, key: &CacheKey) -> BookshelfResult<Option<Vec<u8>>> {
        let value = self.backend.get(key.as_str()).await?;
        tracing::trace!(key = %key, hit = value.is_some(), "Response cache lookup");
        Ok(value)
    }

    pub async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) -> BookshelfResult<()> {
        tracing::trace!(key = %key, bytes = value.len(), ttl_secs = ttl.as_secs(), "Response cache store");
        self.backend.set(key.as_str(), value, ttl).await
    }

    /// Delete the entry under `key`, returning whether one existed.
    pub async fn delete(&self, key: &CacheKey) -> BookshelfResult<bool> {
        let existed = self.backend.delete(key.as_str()).await?;
        tracing::trace!(key = %key, existed, "Response cache delete");
        Ok(existed)
    }

    pub async fn stats(&self) -> BookshelfResult<CacheStats> {
        self.backend.stats().await
    }
}

impl std::fmt::Debug for ResponseCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCacheStore")
            .field("backend", &self.backend.name())
            .finish()
    }
}
