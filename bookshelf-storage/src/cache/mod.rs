//! Response cache: key derivation, backends and the store wrapper.
//!
//! # Design
//!
//! The cache holds serialized responses, not records. A key is derived from
//! the request (method, normalized path, declared vary headers) by a
//! [`CacheKeyDeriver`]; the same deriver is shared by the code that stores
//! reads and the code that invalidates on writes.
//!
//! Backends are chosen once at startup by alias (see [`build_backend`]) and
//! injected wherever caching happens. They are shared, unlocked resources.

pub mod dummy_backend;
pub mod key;
pub mod memory_backend;
pub mod store;
pub mod traits;

use std::sync::Arc;

use bookshelf_core::{BookshelfResult, CacheError};

pub use dummy_backend::DummyCacheBackend;
pub use key::{
    normalize_path, CacheKey, CacheKeyDeriver, RequestFingerprint, VaryContext,
    DEFAULT_KEY_PREFIX,
};
pub use memory_backend::{CacheEntry, MemoryCacheBackend, DEFAULT_MAX_ENTRIES};
pub use store::ResponseCacheStore;
pub use traits::{CacheBackend, CacheStats};

/// Backend implementations selectable by alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Memory,
    Dummy,
}

impl CacheBackendKind {
    /// Resolve a configured alias. Matching is case-insensitive.
    pub fn from_alias(alias: &str) -> BookshelfResult<Self> {
        match alias.trim().to_ascii_lowercase().as_str() {
            "" | "default" | "memory" | "locmem" => Ok(Self::Memory),
            "dummy" | "none" => Ok(Self::Dummy),
            other => Err(CacheError::UnknownBackend {
                alias: other.to_string(),
            }
            .into()),
        }
    }
}

/// Build the backend selected by `alias`.
pub fn build_backend(alias: &str, max_entries: usize) -> BookshelfResult<Arc<dyn CacheBackend>> {
    let backend: Arc<dyn CacheBackend> = match CacheBackendKind::from_alias(alias)? {
        CacheBackendKind::Memory => Arc::new(MemoryCacheBackend::new(max_entries)),
        CacheBackendKind::Dummy => Arc::new(DummyCacheBackend::new()),
    };
    tracing::info!(backend = backend.name(), alias, "Response cache backend selected");
    Ok(backend)
}
