//! Health Check Endpoints
//!
//! - /health/ping - Simple liveness check
//! - /health/live - Process alive check
//! - /health - Process status plus response cache statistics

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use bookshelf_storage::ResponseCacheStore;

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDetails {
    pub cache: ComponentHealth,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Clone)]
pub struct HealthState {
    pub cache: ResponseCacheStore,
    pub start_time: std::time::Instant,
}

impl HealthState {
    pub fn new(cache: ResponseCacheStore) -> Self {
        Self {
            cache,
            start_time: std::time::Instant::now(),
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping - Simple pong response
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live - Process liveness check
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health - Status with response cache statistics
///
/// A failing cache backend degrades the service rather than taking it down:
/// reads fail but writes keep working.
pub async fn status(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let backend = state.cache.backend().name().to_string();
    let cache = match state.cache.stats().await {
        Ok(stats) => ComponentHealth {
            status: HealthStatus::Healthy,
            backend,
            stats: Some(stats.to_json()),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Cache statistics unavailable");
            ComponentHealth {
                status: HealthStatus::Degraded,
                backend,
                stats: None,
                error: Some(e.to_string()),
            }
        }
    };

    let response = HealthResponse {
        status: cache.status,
        message: None,
        details: Some(HealthDetails {
            cache,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.start_time.elapsed().as_secs(),
        }),
    };

    (StatusCode::OK, Json(response))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create health check router
pub fn create_router(cache: ResponseCacheStore) -> Router {
    let state = Arc::new(HealthState::new(cache));

    Router::new()
        .route("/", get(status))
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .with_state(state)
}
