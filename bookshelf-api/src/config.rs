//! API Configuration Module
//!
//! This module provides configuration for CORS, the response cache and the
//! enrichment client. Configuration is loaded from environment variables
//! with sensible defaults for development.

use std::time::Duration;

use bookshelf_storage::{DEFAULT_KEY_PREFIX, DEFAULT_MAX_ENTRIES};

/// Default response cache TTL for book reads (5 minutes).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Upper bound for the response cache TTL (one year). Larger values are clamped.
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Default base URL of the enrichment service.
pub const DEFAULT_ENRICHMENT_BASE_URL: &str = "https://openlibrary.org/isbn";

/// Default enrichment request timeout.
pub const DEFAULT_ENRICHMENT_TIMEOUT_MS: u64 = 2000;

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for CORS and deployment environment.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Deployment environment name (`development`, `production`, ...).
    pub environment: String,

    pub cache: CacheSettings,

    pub enrichment: EnrichmentConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_max_age_secs: 86400,
            environment: "development".to_string(),
            cache: CacheSettings::default(),
            enrichment: EnrichmentConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `BOOKSHELF_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `BOOKSHELF_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `BOOKSHELF_ENVIRONMENT`: Deployment environment (default: development)
    ///
    /// plus the variables read by [`CacheSettings`] and [`EnrichmentConfig`].
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            cors_origins: lookup("BOOKSHELF_CORS_ORIGINS")
                .map(|s| split_list(&s))
                .unwrap_or_default(),
            cors_max_age_secs: parse_or(&lookup, "BOOKSHELF_CORS_MAX_AGE_SECS", defaults.cors_max_age_secs),
            environment: lookup("BOOKSHELF_ENVIRONMENT")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.environment),
            cache: CacheSettings::from_lookup(&lookup),
            enrichment: EnrichmentConfig::from_lookup(&lookup),
        }
    }

    /// Check if running in a production environment.
    pub fn is_production(&self) -> bool {
        matches!(
            self.environment.to_lowercase().as_str(),
            "production" | "prod"
        )
    }
}

// ============================================================================
// RESPONSE CACHE
// ============================================================================

/// Settings for the detail-read response cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Backend alias (`memory`, `dummy`).
    pub backend: String,
    /// Namespace prefix shared by reads and invalidations.
    pub key_prefix: String,
    /// Lifetime of a cached read.
    pub ttl: Duration,
    /// Capacity of the in-process backend.
    pub max_entries: usize,
    /// Request headers whose values split the cache.
    pub vary_headers: Vec<String>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            max_entries: DEFAULT_MAX_ENTRIES,
            vary_headers: Vec::new(),
        }
    }
}

impl CacheSettings {
    /// Environment variables:
    /// - `BOOKSHELF_CACHE_BACKEND` (default: memory)
    /// - `BOOKSHELF_CACHE_KEY_PREFIX` (default: bookshelf)
    /// - `BOOKSHELF_CACHE_TTL_SECS` (default: 300)
    /// - `BOOKSHELF_CACHE_MAX_ENTRIES` (default: 10000)
    /// - `BOOKSHELF_CACHE_VARY_HEADERS`: comma-separated header names
    pub fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            backend: lookup("BOOKSHELF_CACHE_BACKEND").unwrap_or(defaults.backend),
            key_prefix: lookup("BOOKSHELF_CACHE_KEY_PREFIX")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.key_prefix),
            ttl: Duration::from_secs(clamp_ttl_secs(parse_or(
                lookup,
                "BOOKSHELF_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            ))),
            max_entries: parse_or(lookup, "BOOKSHELF_CACHE_MAX_ENTRIES", defaults.max_entries),
            vary_headers: lookup("BOOKSHELF_CACHE_VARY_HEADERS")
                .map(|s| split_list(&s))
                .unwrap_or_default(),
        }
    }
}

// ============================================================================
// ENRICHMENT
// ============================================================================

/// Settings for the outbound enrichment client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentConfig {
    /// Base URL; the client requests `{base_url}/{isbn}.json`.
    pub base_url: String,
    /// Whole-request timeout, redirects included.
    pub timeout: Duration,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ENRICHMENT_BASE_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_ENRICHMENT_TIMEOUT_MS),
        }
    }
}

impl EnrichmentConfig {
    /// Environment variables:
    /// - `BOOKSHELF_ENRICHMENT_BASE_URL` (default: https://openlibrary.org/isbn)
    /// - `BOOKSHELF_ENRICHMENT_TIMEOUT_MS` (default: 2000)
    pub fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            base_url: lookup("BOOKSHELF_ENRICHMENT_BASE_URL")
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_ENRICHMENT_BASE_URL.to_string()),
            timeout: Duration::from_millis(parse_or(
                lookup,
                "BOOKSHELF_ENRICHMENT_TIMEOUT_MS",
                DEFAULT_ENRICHMENT_TIMEOUT_MS,
            )),
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn clamp_ttl_secs(secs: u64) -> u64 {
    if secs > MAX_CACHE_TTL_SECS {
        tracing::warn!(
            requested = secs,
            max = MAX_CACHE_TTL_SECS,
            "Cache TTL too large, clamping"
        );
        MAX_CACHE_TTL_SECS
    } else {
        secs
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparseable configuration value");
            default
        }),
        None => default,
    }
}
