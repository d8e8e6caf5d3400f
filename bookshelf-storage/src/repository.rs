//! Book persistence seam.
//!
//! The HTTP layer only talks to [`BookRepository`]. The in-memory
//! implementation enforces the same rules a relational store would: unique
//! isbn, required fields, creation-ordered listing.

use std::collections::HashMap;

use async_trait::async_trait;
use bookshelf_core::{
    Book, BookChanges, BookFilter, BookshelfResult, NewBook, Page, PageRequest, StorageError,
    WriteMode,
};
use chrono::Utc;
use tokio::sync::RwLock;

/// Async storage trait for book records.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Insert a new book. Fails if the isbn is taken or the payload is invalid.
    async fn create(&self, new: NewBook) -> BookshelfResult<Book>;

    /// Get a book by isbn.
    async fn get(&self, isbn: &str) -> BookshelfResult<Option<Book>>;

    /// List books matching `filter`, oldest first.
    async fn list(&self, filter: &BookFilter, page: PageRequest) -> BookshelfResult<Page<Book>>;

    /// Replace or partially update a book.
    async fn update(
        &self,
        isbn: &str,
        changes: &BookChanges,
        mode: WriteMode,
    ) -> BookshelfResult<Book>;

    /// Delete a book. Returns whether it existed.
    async fn delete(&self, isbn: &str) -> BookshelfResult<bool>;
}

#[derive(Debug, Clone)]
struct StoredBook {
    seq: u64,
    book: Book,
}

#[derive(Debug, Default)]
struct Inner {
    books: HashMap<String, StoredBook>,
    next_seq: u64,
}

/// In-memory book store for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryBookRepository {
    inner: RwLock<Inner>,
}

impl InMemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored books.
    pub async fn len(&self) -> usize {
        self.inner.read().await.books.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn create(&self, new: NewBook) -> BookshelfResult<Book> {
        new.validate()?;

        let mut inner = self.inner.write().await;
        if inner.books.contains_key(&new.isbn) {
            return Err(StorageError::AlreadyExists { isbn: new.isbn }.into());
        }

        let book = Book::from_new(new, Utc::now());
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.books.insert(
            book.isbn.clone(),
            StoredBook {
                seq,
                book: book.clone(),
            },
        );
        Ok(book)
    }

    async fn get(&self, isbn: &str) -> BookshelfResult<Option<Book>> {
        Ok(self
            .inner
            .read()
            .await
            .books
            .get(isbn)
            .map(|stored| stored.book.clone()))
    }

    async fn list(&self, filter: &BookFilter, page: PageRequest) -> BookshelfResult<Page<Book>> {
        let inner = self.inner.read().await;
        let mut matching: Vec<&StoredBook> = inner
            .books
            .values()
            .filter(|stored| filter.matches(&stored.book))
            .collect();
        matching.sort_by_key(|stored| (stored.book.created_at, stored.seq));

        let count = matching.len();
        let results = matching
            .into_iter()
            .skip(page.offset())
            .take(page.page_size)
            .map(|stored| stored.book.clone())
            .collect();

        Ok(Page {
            count,
            page: page.page,
            page_size: page.page_size,
            results,
        })
    }

    async fn update(
        &self,
        isbn: &str,
        changes: &BookChanges,
        mode: WriteMode,
    ) -> BookshelfResult<Book> {
        changes.validate(isbn, mode)?;

        let mut inner = self.inner.write().await;
        let stored = inner
            .books
            .get_mut(isbn)
            .ok_or_else(|| StorageError::NotFound {
                isbn: isbn.to_string(),
            })?;
        stored.book.apply(changes, Utc::now());
        Ok(stored.book.clone())
    }

    async fn delete(&self, isbn: &str) -> BookshelfResult<bool> {
        Ok(self.inner.write().await.books.remove(isbn).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_core::{BookshelfError, ValidationError};
    use bookshelf_test_utils::{hobbit_new_book, lotr_new_book};

    #[tokio::test]
    async fn test_create_and_get() -> BookshelfResult<()> {
        let repo = InMemoryBookRepository::new();
        let created = repo.create(lotr_new_book()).await?;
        assert_eq!(created.created_at, created.updated_at);

        let fetched = repo.get("9780544003415").await?;
        assert_eq!(fetched, Some(created));
        assert_eq!(repo.get("9780547928227").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_isbn_rejected() -> BookshelfResult<()> {
        let repo = InMemoryBookRepository::new();
        repo.create(lotr_new_book()).await?;
        let err = repo.create(lotr_new_book()).await.unwrap_err();
        assert!(matches!(
            err,
            BookshelfError::Storage(StorageError::AlreadyExists { .. })
        ));
        assert_eq!(repo.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_isbn_rejected() {
        let repo = InMemoryBookRepository::new();
        let mut new = lotr_new_book();
        new.isbn = "123".to_string();
        let err = repo.create(new).await.unwrap_err();
        assert!(matches!(err, BookshelfError::Validation(_)));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_partial_update() -> BookshelfResult<()> {
        let repo = InMemoryBookRepository::new();
        repo.create(lotr_new_book()).await?;
        let changes = BookChanges {
            title: Some("Something completely different".to_string()),
            description: Some("Updated description".to_string()),
            ..Default::default()
        };
        let updated = repo
            .update("9780544003415", &changes, WriteMode::Partial)
            .await?;
        assert_eq!(updated.title, "Something completely different");
        assert_eq!(updated.description, "Updated description");
        assert_eq!(updated.author, "J.R.R. Tolkien");
        Ok(())
    }

    #[tokio::test]
    async fn test_update_rejects_isbn_change_without_mutation() -> BookshelfResult<()> {
        let repo = InMemoryBookRepository::new();
        let original = repo.create(lotr_new_book()).await?;
        let changes = BookChanges {
            isbn: Some("9780547928227".to_string()),
            title: Some("Changed".to_string()),
            ..Default::default()
        };
        let err = repo
            .update("9780544003415", &changes, WriteMode::Partial)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BookshelfError::Validation(ValidationError::ImmutableField { .. })
        ));
        assert_eq!(repo.get("9780544003415").await?, Some(original));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_book() {
        let repo = InMemoryBookRepository::new();
        let changes = BookChanges {
            title: Some("Nope".to_string()),
            ..Default::default()
        };
        let err = repo
            .update("9780544003415", &changes, WriteMode::Partial)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BookshelfError::Storage(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() -> BookshelfResult<()> {
        let repo = InMemoryBookRepository::new();
        repo.create(lotr_new_book()).await?;
        repo.create(hobbit_new_book()).await?;

        let all = repo.list(&BookFilter::default(), PageRequest::default()).await?;
        assert_eq!(all.count, 2);
        assert_eq!(all.results[0].isbn, "9780544003415");
        assert_eq!(all.results[1].isbn, "9780547928227");

        let tolkien = BookFilter {
            author: Some("Tolkien".to_string()),
            title: Some("hobbit".to_string()),
            ..Default::default()
        };
        let page = repo.list(&tolkien, PageRequest::default()).await?;
        assert_eq!(page.count, 1);
        assert_eq!(page.results[0].title, "The Hobbit");

        let second = repo
            .list(&BookFilter::default(), PageRequest::new(Some(2), Some(1)))
            .await?;
        assert_eq!(second.count, 2);
        assert_eq!(second.results.len(), 1);
        assert_eq!(second.results[0].isbn, "9780547928227");
        Ok(())
    }

    #[tokio::test]
    async fn test_delete() -> BookshelfResult<()> {
        let repo = InMemoryBookRepository::new();
        repo.create(lotr_new_book()).await?;
        assert!(repo.delete("9780544003415").await?);
        assert!(!repo.delete("9780544003415").await?);
        assert!(repo.is_empty().await);
        Ok(())
    }
}
