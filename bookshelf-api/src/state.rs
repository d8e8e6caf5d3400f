//! Shared application state for Axum routers.

use std::sync::Arc;

use bookshelf_storage::{BookRepository, InMemoryBookRepository};

use crate::config::ApiConfig;
use crate::enrichment::{EnrichmentSource, OpenLibraryClient};
use crate::error::ApiResult;
use crate::middleware::DetailCache;
use crate::routes::book::BookState;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Book storage plus the enrichment source used on detail reads.
    pub books: Arc<BookState>,
    /// Response cache bound to the book detail operations.
    pub cache: DetailCache,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn BookRepository>,
        enrichment: Arc<dyn EnrichmentSource>,
        cache: DetailCache,
    ) -> Self {
        Self {
            books: Arc::new(BookState::new(repository, enrichment)),
            cache,
        }
    }

    /// Build state from configuration: an in-memory book store, the Open
    /// Library client and the configured cache backend.
    pub fn from_config(config: &ApiConfig) -> ApiResult<Self> {
        let repository: Arc<dyn BookRepository> = Arc::new(InMemoryBookRepository::new());
        let enrichment: Arc<dyn EnrichmentSource> =
            Arc::new(OpenLibraryClient::new(&config.enrichment)?);
        let cache = DetailCache::from_settings(&config.cache)?;

        tracing::info!(
            cache_backend = cache.store().backend().name(),
            cache_ttl_secs = cache.ttl().as_secs(),
            enrichment_url = %config.enrichment.base_url,
            "Application state initialized"
        );

        Ok(Self::new(repository, enrichment, cache))
    }
}
