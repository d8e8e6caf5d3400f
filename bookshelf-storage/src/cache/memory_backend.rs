//! In-process cache backend with per-entry TTL.
//!
//! Entries live in a sharded `DashMap`, so concurrent readers and writers on
//! different keys do not contend. Expiry is lazy: an expired entry is dropped
//! when it is next read, or when capacity pressure forces a purge.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bookshelf_core::BookshelfResult;
use dashmap::DashMap;

use super::traits::{CacheBackend, CacheStats};

/// Default capacity of the memory backend.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// A stored value and the instant it stops being served.
///
/// `expires_at` is `None` when the TTL reaches past what `Instant` can
/// represent; such an entry lives until deleted or evicted.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: Vec<u8>,
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }

    /// Eviction order: soonest expiry first, unbounded entries last.
    fn eviction_rank(&self) -> (bool, Option<Instant>) {
        (self.expires_at.is_none(), self.expires_at)
    }
}

/// Thread-safe in-memory cache backend.
#[derive(Debug)]
pub struct MemoryCacheBackend {
    entries: DashMap<String, CacheEntry>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl MemoryCacheBackend {
    /// Create a backend holding at most `max_entries` values.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Make room for one more entry.
    fn reserve_slot(&self, now: Instant) {
        if self.entries.len() < self.max_entries {
            return;
        }

        self.entries.retain(|_, entry| entry.is_live(now));
        if self.entries.len() < self.max_entries {
            return;
        }

        let soonest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.eviction_rank())
            .map(|entry| entry.key().clone());
        if let Some(key) = soonest {
            if self.entries.remove(&key).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "Evicted cache entry at capacity");
            }
        }
    }
}

impl Default for MemoryCacheBackend {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> BookshelfResult<Option<Vec<u8>>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(entry.value.clone()));
            }
            // Entry expired, remove it
            drop(entry);
            self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> BookshelfResult<()> {
        if ttl.is_zero() {
            self.entries.remove(key);
            return Ok(());
        }

        let now = Instant::now();
        if !self.entries.contains_key(key) {
            self.reserve_slot(now);
        }

        let entry = CacheEntry {
            key: key.to_string(),
            value,
            expires_at: now.checked_add(ttl),
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> BookshelfResult<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .map(|(_, entry)| entry.is_live(now))
            .unwrap_or(false))
    }

    async fn clear(&self) -> BookshelfResult<u64> {
        let count = self.entries.len() as u64;
        self.entries.clear();
        Ok(count)
    }

    async fn stats(&self) -> BookshelfResult<CacheStats> {
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.len() as u64,
            evictions: self.evictions.load(Ordering::Relaxed),
        })
    }
}
