//! Bookshelf Core - Entity Types
//!
//! Record types, request payloads and the error taxonomy shared by every
//! other crate in the workspace.

pub mod entities;
pub mod error;
pub mod isbn;

pub use entities::{
    Book, BookChanges, BookFilter, NewBook, Page, PageRequest, Timestamp, WriteMode,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use error::{BookshelfError, BookshelfResult, CacheError, StorageError, ValidationError};
pub use isbn::{validate_isbn, ISBN_FIELD};
