//! Error types for Bookshelf operations

use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Book not found: isbn {isbn}")]
    NotFound { isbn: String },

    #[error("Book with isbn {isbn} already exists")]
    AlreadyExists { isbn: String },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Field {field} cannot be updated: {reason}")]
    ImmutableField { field: String, reason: String },
}

impl ValidationError {
    /// Name of the field the error refers to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::RequiredFieldMissing { field }
            | ValidationError::InvalidValue { field, .. }
            | ValidationError::ImmutableField { field, .. } => field,
        }
    }
}

/// Response cache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache backend '{backend}' failed: {reason}")]
    Backend { backend: String, reason: String },

    #[error("Unknown cache backend alias: {alias}")]
    UnknownBackend { alias: String },

    #[error("Operation '{operation}' is not registered on this resource")]
    OperationNotFound { operation: String },
}

/// Master error type for all Bookshelf errors.
#[derive(Debug, Clone, Error)]
pub enum BookshelfError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Result type alias for Bookshelf operations.
pub type BookshelfResult<T> = Result<T, BookshelfError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display_not_found() {
        let err = StorageError::NotFound {
            isbn: "9780544003415".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("not found"));
        assert!(msg.contains("9780544003415"));
    }

    #[test]
    fn test_validation_error_field() {
        let err = ValidationError::ImmutableField {
            field: "isbn".to_string(),
            reason: "delete the book and create a new one".to_string(),
        };
        assert_eq!(err.field(), "isbn");
        assert!(format!("{}", err).contains("cannot be updated"));
    }

    #[test]
    fn test_cache_error_display_operation_not_found() {
        let err = CacheError::OperationNotFound {
            operation: "non_existent_method".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Operation 'non_existent_method' is not registered on this resource"
        );
    }

    #[test]
    fn test_master_error_from_conversions() {
        let err: BookshelfError = CacheError::UnknownBackend {
            alias: "redis".to_string(),
        }
        .into();
        assert!(matches!(err, BookshelfError::Cache(_)));
        assert!(format!("{}", err).starts_with("Cache error"));
    }
}
