//! Scripted enrichment source that counts lookups.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::async_trait;
use bookshelf_api::{EnrichmentFailure, EnrichmentResult, EnrichmentSource};
use serde_json::Value;
use tokio::sync::Barrier;

pub struct ScriptedEnrichment {
    calls: AtomicUsize,
    result: Mutex<EnrichmentResult>,
    barrier: Option<Arc<Barrier>>,
}

impl ScriptedEnrichment {
    pub fn returning(payload: Value) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            result: Mutex::new(EnrichmentResult::Present(payload)),
            barrier: None,
        })
    }

    pub fn failing(failure: EnrichmentFailure) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            result: Mutex::new(EnrichmentResult::Absent(failure)),
            barrier: None,
        })
    }

    /// Every lookup waits until `parties` lookups are in flight.
    pub fn gated(payload: Value, parties: usize) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            result: Mutex::new(EnrichmentResult::Present(payload)),
            barrier: Some(Arc::new(Barrier::new(parties))),
        })
    }

    pub fn set_payload(&self, payload: Value) {
        *self.result.lock().expect("enrichment result lock") = EnrichmentResult::Present(payload);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnrichmentSource for ScriptedEnrichment {
    async fn fetch(&self, _isbn: &str) -> EnrichmentResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        self.result.lock().expect("enrichment result lock").clone()
    }
}
