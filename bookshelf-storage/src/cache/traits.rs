//! Cache backend trait and usage statistics.
//!
//! Backends store opaque byte values under string keys with a per-entry
//! time-to-live. They add no cross-key coordination: each call is only as
//! atomic as the backend's single-key operations.

use std::time::Duration;

use async_trait::async_trait;
use bookshelf_core::BookshelfResult;
use serde_json::json;

/// Cache backend trait for pluggable cache implementations.
///
/// Implementations must be thread-safe; they are shared by every request
/// worker without any locking on top.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short name of the backend, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Get a live value. Expired entries are reported as absent.
    async fn get(&self, key: &str) -> BookshelfResult<Option<Vec<u8>>>;

    /// Store a value, replacing any previous entry under the same key.
    ///
    /// A zero `ttl` means the value expires immediately and is not stored.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> BookshelfResult<()>;

    /// Delete a value. Returns whether a live entry existed.
    ///
    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> BookshelfResult<bool>;

    /// Drop every entry, returning how many were removed.
    async fn clear(&self) -> BookshelfResult<u64>;

    /// Get cache statistics.
    async fn stats(&self) -> BookshelfResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache (may include expired ones not yet purged).
    pub entry_count: u64,
    /// Number of evictions due to capacity.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// JSON view used by the health endpoint.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "hits": self.hits,
            "misses": self.misses,
            "entries": self.entry_count,
            "evictions": self.evictions,
            "hit_rate": self.hit_rate(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_cache_stats_json() {
        let stats = CacheStats {
            hits: 1,
            misses: 3,
            entry_count: 2,
            evictions: 0,
        };
        let value = stats.to_json();
        assert_eq!(value["hits"], 1);
        assert_eq!(value["misses"], 3);
        assert_eq!(value["entries"], 2);
    }
}
