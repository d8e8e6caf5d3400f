//! Book record and the request payloads that create or change it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::isbn::{validate_isbn, ISBN_FIELD};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Default number of books per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Upper bound for a client-requested page size.
pub const MAX_PAGE_SIZE: usize = 100;

// ============================================================================
// RECORD
// ============================================================================

/// A book, identified by its ISBN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub publication_date: NaiveDate,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Book {
    /// Build a stored record from a validated creation payload.
    pub fn from_new(new: NewBook, now: Timestamp) -> Self {
        Self {
            isbn: new.isbn,
            title: new.title,
            author: new.author,
            description: new.description,
            publication_date: new.publication_date,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply validated changes in place, bumping `updated_at`.
    ///
    /// The isbn is never touched here; callers reject identifier changes
    /// through [`BookChanges::validate`].
    pub fn apply(&mut self, changes: &BookChanges, now: Timestamp) {
        if let Some(title) = &changes.title {
            self.title = title.clone();
        }
        if let Some(author) = &changes.author {
            self.author = author.clone();
        }
        if let Some(description) = &changes.description {
            self.description = description.clone();
        }
        if let Some(publication_date) = changes.publication_date {
            self.publication_date = publication_date;
        }
        self.updated_at = now;
    }
}

// ============================================================================
// PAYLOADS
// ============================================================================

/// Payload for creating a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub publication_date: NaiveDate,
}

impl NewBook {
    /// Validate the isbn shape and that text fields are not blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_isbn(&self.isbn)?;
        require_text("title", &self.title)?;
        require_text("author", &self.author)?;
        require_text("description", &self.description)?;
        Ok(())
    }
}

/// How a write treats fields absent from its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Full replacement: every field except the isbn is required.
    Replace,
    /// Partial update: only the fields present are changed.
    Partial,
}

/// Payload for `PUT` and `PATCH` on a single book.
///
/// `isbn` is accepted so that a body echoing the current identifier is
/// valid; any other value is rejected. Unknown fields (timestamps, enrichment
/// data copied from a read) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<NaiveDate>,
}

impl BookChanges {
    /// Validate changes against the isbn the write is addressed to.
    pub fn validate(&self, isbn: &str, mode: WriteMode) -> Result<(), ValidationError> {
        if let Some(requested) = &self.isbn {
            if requested != isbn {
                return Err(ValidationError::ImmutableField {
                    field: ISBN_FIELD.to_string(),
                    reason: "If you need to update it, delete the book and create a new one."
                        .to_string(),
                });
            }
        }

        let text_fields = [
            ("title", &self.title),
            ("author", &self.author),
            ("description", &self.description),
        ];
        for (field, value) in text_fields {
            match value {
                Some(value) => require_text(field, value)?,
                None if mode == WriteMode::Replace => {
                    return Err(ValidationError::RequiredFieldMissing {
                        field: field.to_string(),
                    })
                }
                None => {}
            }
        }

        if mode == WriteMode::Replace && self.publication_date.is_none() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "publication_date".to_string(),
            });
        }

        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: field.to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// LISTING
// ============================================================================

/// Filters for listing books. Text filters match case-insensitive substrings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookFilter {
    pub author: Option<String>,
    pub title: Option<String>,
    pub publication_date: Option<NaiveDate>,
}

impl BookFilter {
    pub fn matches(&self, book: &Book) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            needle
                .as_ref()
                .map(|n| haystack.to_lowercase().contains(&n.to_lowercase()))
                .unwrap_or(true)
        }

        contains(&book.author, &self.author)
            && contains(&book.title, &self.title)
            && self
                .publication_date
                .map(|d| d == book.publication_date)
                .unwrap_or(true)
    }
}

/// One-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    /// Clamp client input into a usable page request.
    pub fn new(page: Option<usize>, page_size: Option<usize>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Number of items to skip.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// A page of results plus the total count across all pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: usize,
    pub page: usize,
    pub page_size: usize,
    pub results: Vec<T>,
}
