//! Backend that never stores anything.
//!
//! Selecting it turns response caching off without changing the wiring:
//! every read misses and every delete reports that nothing existed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bookshelf_core::BookshelfResult;

use super::traits::{CacheBackend, CacheStats};

#[derive(Debug, Default)]
pub struct DummyCacheBackend {
    misses: AtomicU64,
}

impl DummyCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for DummyCacheBackend {
    fn name(&self) -> &'static str {
        "dummy"
    }

    async fn get(&self, _key: &str) -> BookshelfResult<Option<Vec<u8>>> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> BookshelfResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> BookshelfResult<bool> {
        Ok(false)
    }

    async fn clear(&self) -> BookshelfResult<u64> {
        Ok(0)
    }

    async fn stats(&self) -> BookshelfResult<CacheStats> {
        Ok(CacheStats {
            misses: self.misses.load(Ordering::Relaxed),
            ..Default::default()
        })
    }
}
