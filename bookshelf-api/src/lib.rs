//! Bookshelf API - REST layer for the book catalog
//!
//! Exposes CRUD endpoints for books (Axum). Single-book reads are enriched
//! from an external catalog and served through a response cache that is
//! invalidated before every update of the same book.

pub mod config;
pub mod enrichment;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::{ApiConfig, CacheSettings, EnrichmentConfig};
pub use enrichment::{
    merge_enrichment, EnrichmentFailure, EnrichmentResult, EnrichmentSource, FailureKind,
    OpenLibraryClient, ENRICHMENT_FIELD,
};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{CacheBinding, DetailCache, OperationTable, WriteGuard, X_CACHE};
pub use routes::book::{BookState, BookWriteGuard};
pub use routes::create_api_router;
pub use state::AppState;
