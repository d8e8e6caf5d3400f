//! REST API Routes Module
//!
//! Includes:
//! - Book CRUD routes, with cached and enriched detail reads
//! - Health check endpoints
//! - CORS support for browser-based clients

pub mod book;
pub mod health;

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::middleware::X_CACHE;
use crate::state::AppState;

pub use book::create_router as book_router;
pub use health::create_router as health_router;

// ============================================================================
// PRODUCTION VALIDATION
// ============================================================================

/// Validate API configuration for production use.
fn validate_api_config_for_production(config: &ApiConfig) -> ApiResult<()> {
    if config.cors_origins.is_empty() {
        return Err(ApiError::invalid_input(
            "CORS origins not configured for production. Set BOOKSHELF_CORS_ORIGINS.",
        ));
    }
    if config.cache.backend.eq_ignore_ascii_case("dummy") {
        tracing::warn!("Response cache is disabled in production (BOOKSHELF_CACHE_BACKEND=dummy)");
    }
    Ok(())
}

// ============================================================================
// ROUTER BUILDER
// ============================================================================

/// Builder for the API router.
///
/// Every route is wrapped with request tracing and CORS. In production the
/// configuration is validated before anything is built.
pub struct ApiRouterBuilder {
    state: AppState,
    api_config: ApiConfig,
}

impl ApiRouterBuilder {
    pub fn new(state: AppState, api_config: ApiConfig) -> ApiResult<Self> {
        if api_config.is_production() {
            validate_api_config_for_production(&api_config)?;
        }
        Ok(Self { state, api_config })
    }

    /// Build the complete router.
    pub fn build(self) -> ApiResult<Router> {
        let router = Router::new()
            .nest(
                "/books",
                book::create_router(self.state.books.clone(), &self.state.cache)?,
            )
            .nest("/health", health::create_router(self.state.cache.store().clone()));

        let cors = build_cors_layer(&self.api_config);

        Ok(router.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        ))
    }
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ACCEPT_LANGUAGE])
        .expose_headers([X_CACHE.clone(), header::CACHE_CONTROL])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Create the complete API router.
///
/// - Books at /books and /books/:isbn
/// - Health checks at /health/*
pub fn create_api_router(state: AppState, api_config: &ApiConfig) -> ApiResult<Router> {
    ApiRouterBuilder::new(state, api_config.clone()).and_then(|builder| builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_requires_cors_origins() -> ApiResult<()> {
        let config = ApiConfig {
            environment: "production".to_string(),
            ..Default::default()
        };
        let state = AppState::from_config(&config)?;
        assert!(create_api_router(state, &config).is_err());
        Ok(())
    }

    #[test]
    fn test_production_with_origins_builds() -> ApiResult<()> {
        let config = ApiConfig {
            environment: "production".to_string(),
            cors_origins: vec!["https://bookshelf.example".to_string()],
            ..Default::default()
        };
        let state = AppState::from_config(&config)?;
        create_api_router(state, &config)?;
        Ok(())
    }
}
