//! Bookshelf Storage - Response Cache and Book Repository
//!
//! Holds everything that keeps state for the API: the response cache
//! (key derivation, pluggable backends) and the book persistence seam.

pub mod cache;
pub mod repository;

// Re-export cache types for API integration
pub use cache::{
    build_backend, normalize_path, CacheBackend, CacheBackendKind, CacheKey, CacheKeyDeriver,
    CacheStats, DummyCacheBackend, MemoryCacheBackend, RequestFingerprint, ResponseCacheStore,
    VaryContext, DEFAULT_KEY_PREFIX, DEFAULT_MAX_ENTRIES,
};
pub use repository::{BookRepository, InMemoryBookRepository};
