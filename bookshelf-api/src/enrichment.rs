//! Book enrichment from an external catalog.
//!
//! A read of a single book is augmented with whatever the external catalog
//! knows about its ISBN. The call never fails the read: every transport or
//! decoding problem degrades to [`EnrichmentResult::Absent`] and is logged
//! with the ISBN and the failure kind.

use axum::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::EnrichmentConfig;
use crate::error::{ApiError, ApiResult};

/// Field under which enrichment data is merged into a book response.
pub const ENRICHMENT_FIELD: &str = "raw_enrichment_data";

/// Maximum number of redirects followed for one lookup.
const MAX_REDIRECTS: usize = 10;

/// Why an enrichment lookup produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Connect,
    Timeout,
    Http,
    Decode,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Connect => "connect-error",
            FailureKind::Timeout => "timeout",
            FailureKind::Http => "http-error",
            FailureKind::Decode => "decode-error",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed lookup, classified.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnrichmentFailure {
    #[error("connection to enrichment service failed: {0}")]
    Connect(String),

    #[error("enrichment request timed out: {0}")]
    Timeout(String),

    #[error("enrichment request failed: {0}")]
    Http(String),

    #[error("enrichment response is not valid JSON: {0}")]
    Decode(String),
}

impl EnrichmentFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            EnrichmentFailure::Connect(_) => FailureKind::Connect,
            EnrichmentFailure::Timeout(_) => FailureKind::Timeout,
            EnrichmentFailure::Http(_) => FailureKind::Http,
            EnrichmentFailure::Decode(_) => FailureKind::Decode,
        }
    }
}

/// Outcome of one enrichment lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentResult {
    Present(Value),
    Absent(EnrichmentFailure),
}

/// Source of supplemental book data.
#[async_trait]
pub trait EnrichmentSource: Send + Sync {
    /// Look up `isbn`. Implementations must not return errors; failures are
    /// reported as [`EnrichmentResult::Absent`].
    async fn fetch(&self, isbn: &str) -> EnrichmentResult;
}

/// Merge an enrichment result into a serialized book.
///
/// Only a present, non-empty payload is merged. `null`, `false`, `0`, `""`,
/// `[]` and `{}` leave the record untouched.
pub fn merge_enrichment(record: &mut Value, result: EnrichmentResult) {
    let EnrichmentResult::Present(payload) = result else {
        return;
    };
    if is_empty_payload(&payload) {
        return;
    }
    if let Value::Object(fields) = record {
        fields.insert(ENRICHMENT_FIELD.to_string(), payload);
    }
}

fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

// ============================================================================
// OPEN LIBRARY CLIENT
// ============================================================================

/// HTTP enrichment client for the Open Library edition-by-ISBN endpoint.
///
/// Issues exactly one `GET {base_url}/{isbn}.json` per lookup, following
/// redirects, bounded by the configured timeout. The response status is not
/// inspected: an error page that is not JSON surfaces as a decode failure.
#[derive(Debug, Clone)]
pub struct OpenLibraryClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenLibraryClient {
    pub fn new(config: &EnrichmentConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| {
                ApiError::internal_error(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL looked up for `isbn`.
    pub fn url_for(&self, isbn: &str) -> String {
        format!("{}/{}.json", self.base_url, isbn)
    }

    async fn lookup(&self, isbn: &str) -> Result<Value, EnrichmentFailure> {
        let response = self
            .client
            .get(self.url_for(isbn))
            .send()
            .await
            .map_err(classify_transport_error)?;

        let body = response.bytes().await.map_err(classify_transport_error)?;

        serde_json::from_slice(&body).map_err(|e| EnrichmentFailure::Decode(e.to_string()))
    }
}

#[async_trait]
impl EnrichmentSource for OpenLibraryClient {
    async fn fetch(&self, isbn: &str) -> EnrichmentResult {
        match self.lookup(isbn).await {
            Ok(payload) => {
                tracing::debug!(isbn, "Enrichment data received");
                EnrichmentResult::Present(payload)
            }
            Err(failure) => {
                tracing::error!(
                    isbn,
                    kind = %failure.kind(),
                    error = %failure,
                    "Enrichment lookup failed"
                );
                EnrichmentResult::Absent(failure)
            }
        }
    }
}

/// Map a transport error onto a failure kind.
///
/// Timeouts win over connection errors, so a connect that times out is
/// reported as a timeout.
fn classify_transport_error(err: reqwest::Error) -> EnrichmentFailure {
    if err.is_timeout() {
        EnrichmentFailure::Timeout(err.to_string())
    } else if err.is_connect() {
        EnrichmentFailure::Connect(err.to_string())
    } else {
        EnrichmentFailure::Http(err.to_string())
    }
}
