//! Bookshelf Test Utilities
//!
//! Shared test infrastructure for the Bookshelf workspace:
//! - Test fixtures for the books used across suites
//! - Proptest generators for ISBNs and book payloads
//! - Assertions over the error taxonomy

pub use bookshelf_core::{
    Book, BookChanges, BookshelfError, BookshelfResult, CacheError, NewBook, StorageError,
    ValidationError,
};

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built books for common testing scenarios.

    use super::*;
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    pub const LOTR_ISBN: &str = "9780544003415";
    pub const HOBBIT_ISBN: &str = "9780547928227";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    /// The Lord of the Rings, the book most suites create first.
    pub fn lotr_new_book() -> NewBook {
        NewBook {
            isbn: LOTR_ISBN.to_string(),
            title: "The Lord of the Rings".to_string(),
            author: "J.R.R. Tolkien".to_string(),
            description: "An epic fantasy novel".to_string(),
            publication_date: date(1954, 7, 29),
        }
    }

    pub fn hobbit_new_book() -> NewBook {
        NewBook {
            isbn: HOBBIT_ISBN.to_string(),
            title: "The Hobbit".to_string(),
            author: "J.R.R. Tolkien".to_string(),
            description: "There and back again".to_string(),
            publication_date: date(1937, 9, 21),
        }
    }

    /// An ISBN-10 book ending in the `X` check character.
    pub fn isbn10_new_book() -> NewBook {
        NewBook {
            isbn: "155404295X".to_string(),
            title: "Test Book".to_string(),
            author: "Test Author".to_string(),
            description: "Test Description".to_string(),
            publication_date: date(2023, 1, 1),
        }
    }

    /// JSON request body for creating `book`.
    pub fn new_book_json(book: &NewBook) -> Value {
        json!({
            "isbn": book.isbn,
            "title": book.title,
            "author": book.author,
            "description": book.description,
            "publication_date": book.publication_date.to_string(),
        })
    }

    /// Sample enrichment payload in the shape the Open Library edition API returns.
    pub fn enrichment_payload(isbn: &str) -> Value {
        json!({
            "title": "The Lord of the Rings",
            "number_of_pages": 1216,
            "publishers": ["Houghton Mifflin Harcourt"],
            "isbn_13": [isbn],
            "key": "/books/OL26885325M",
        })
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for ISBNs and book payloads.

    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    /// Generate a well-formed ISBN-13 (13 ASCII digits).
    pub fn arb_isbn13() -> impl Strategy<Value = String> {
        "[0-9]{13}"
    }

    /// Generate a well-formed ISBN-10 (last character a digit or `X`).
    pub fn arb_isbn10() -> impl Strategy<Value = String> {
        "[0-9]{9}[0-9X]"
    }

    /// Generate any ISBN accepted by the model validation.
    pub fn arb_isbn() -> impl Strategy<Value = String> {
        prop_oneof![arb_isbn13(), arb_isbn10()]
    }

    /// Generate a string whose length can never be a valid ISBN.
    pub fn arb_bad_length_isbn() -> impl Strategy<Value = String> {
        "[0-9]{0,9}|[0-9]{11,12}|[0-9]{14,20}"
    }

    pub fn arb_publication_date() -> impl Strategy<Value = NaiveDate> {
        (1450i32..2030, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default())
    }

    fn arb_text() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z .,'-]{0,40}"
    }

    /// Generate a valid creation payload.
    pub fn arb_new_book() -> impl Strategy<Value = NewBook> {
        (
            arb_isbn(),
            arb_text(),
            arb_text(),
            arb_text(),
            arb_publication_date(),
        )
            .prop_map(|(isbn, title, author, description, publication_date)| NewBook {
                isbn,
                title,
                author,
                description,
                publication_date,
            })
    }

    /// Generate a partial update that never touches the isbn.
    pub fn arb_partial_changes() -> impl Strategy<Value = BookChanges> {
        (
            proptest::option::of(arb_text()),
            proptest::option::of(arb_text()),
            proptest::option::of(arb_text()),
            proptest::option::of(arb_publication_date()),
        )
            .prop_map(|(title, author, description, publication_date)| BookChanges {
                isbn: None,
                title,
                author,
                description,
                publication_date,
            })
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over [`BookshelfResult`] errors.

    use super::*;

    pub fn assert_not_found<T: std::fmt::Debug>(result: &BookshelfResult<T>) {
        assert!(
            matches!(
                result,
                Err(BookshelfError::Storage(StorageError::NotFound { .. }))
            ),
            "Expected NotFound, got {:?}",
            result
        );
    }

    pub fn assert_already_exists<T: std::fmt::Debug>(result: &BookshelfResult<T>) {
        assert!(
            matches!(
                result,
                Err(BookshelfError::Storage(StorageError::AlreadyExists { .. }))
            ),
            "Expected AlreadyExists, got {:?}",
            result
        );
    }

    /// Assert a validation error naming `field`.
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &BookshelfResult<T>, field: &str) {
        match result {
            Err(BookshelfError::Validation(err)) => assert_eq!(err.field(), field),
            other => panic!("Expected validation error on '{}', got {:?}", field, other),
        }
    }
}

pub use fixtures::{hobbit_new_book, isbn10_new_book, lotr_new_book, HOBBIT_ISBN, LOTR_ISBN};
