//! API error type.
//!
//! Every failure leaving a handler is an [`ApiError`], rendered as a JSON
//! body `{code, message, details?}` with the status its [`ErrorCode`] maps
//! to. Domain errors from the core and storage crates convert via `From`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bookshelf_core::{BookshelfError, CacheError, StorageError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODES
// ============================================================================

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // 400
    ValidationFailed,
    InvalidInput,
    MissingField,
    /// A book with the same ISBN is already stored.
    EntityAlreadyExists,

    // 404
    BookNotFound,

    // 413
    PayloadTooLarge,

    // 500
    InternalError,
    /// The response cache backend failed during a read.
    CacheError,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingField
            | ErrorCode::EntityAlreadyExists => StatusCode::BAD_REQUEST,

            ErrorCode::BookNotFound => StatusCode::NOT_FOUND,

            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,

            ErrorCode::InternalError | ErrorCode::CacheError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    /// Extra context, e.g. `{"field": "isbn"}` for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn book_already_exists(isbn: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityAlreadyExists,
            format!("Book with isbn {} already exists", isbn),
        )
        .with_details(serde_json::json!({ "field": "isbn" }))
    }

    pub fn book_not_found(isbn: impl fmt::Display) -> Self {
        Self::new(ErrorCode::BookNotFound, format!("Book {} not found", isbn))
    }

    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            ErrorCode::PayloadTooLarge,
            format!("Request body exceeds {} bytes", limit),
        )
        .with_details(serde_json::json!({ "limit": limit }))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn cache_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CacheError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let field = err.field().to_string();
        let code = match err {
            ValidationError::RequiredFieldMissing { .. } => ErrorCode::MissingField,
            ValidationError::InvalidValue { .. } | ValidationError::ImmutableField { .. } => {
                ErrorCode::ValidationFailed
            }
        };
        ApiError::new(code, err.to_string()).with_details(serde_json::json!({ "field": field }))
    }
}

impl From<BookshelfError> for ApiError {
    fn from(err: BookshelfError) -> Self {
        match err {
            BookshelfError::Validation(err) => err.into(),
            BookshelfError::Storage(StorageError::NotFound { isbn }) => {
                ApiError::book_not_found(isbn)
            }
            BookshelfError::Storage(StorageError::AlreadyExists { isbn }) => {
                ApiError::book_already_exists(isbn)
            }
            BookshelfError::Cache(err @ CacheError::Backend { .. }) => {
                tracing::error!(error = %err, "Response cache error");
                ApiError::cache_error(err.to_string())
            }
            BookshelfError::Cache(err) => {
                tracing::error!(error = %err, "Cache configuration error");
                ApiError::internal_error(err.to_string())
            }
        }
    }
}

/// Malformed request bodies are a client error.
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::debug!(error = %err, "Rejected malformed JSON");
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
