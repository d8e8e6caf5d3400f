//! Book REST API Routes
//!
//! Collection routes (`/books`) are plain data access. Detail routes
//! (`/books/:isbn`) are registered as named operations so the response
//! cache can wrap `retrieve` and invalidate on `update`, `partial_update`
//! and `destroy`.

use std::sync::Arc;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, put},
    Json, Router,
};
use bookshelf_core::{BookChanges, BookFilter, NewBook, PageRequest, WriteMode};
use bookshelf_storage::BookRepository;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    enrichment::{merge_enrichment, EnrichmentSource},
    error::{ApiError, ApiResult},
    extractors::JsonBody,
    middleware::cache::{
        CacheBinding, DetailCache, OperationTable, WriteGuard, DESTROY, PARTIAL_UPDATE, RETRIEVE,
        UPDATE,
    },
};

// ============================================================================
// SHARED STATE
// ============================================================================

/// Shared application state for book routes.
#[derive(Clone)]
pub struct BookState {
    pub repository: Arc<dyn BookRepository>,
    pub enrichment: Arc<dyn EnrichmentSource>,
}

impl BookState {
    pub fn new(repository: Arc<dyn BookRepository>, enrichment: Arc<dyn EnrichmentSource>) -> Self {
        Self {
            repository,
            enrichment,
        }
    }
}

/// Query parameters for `GET /books`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListBooksQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub publication_date: Option<NaiveDate>,
}

impl ListBooksQuery {
    fn into_parts(self) -> (BookFilter, PageRequest) {
        (
            BookFilter {
                author: self.author.filter(|s| !s.is_empty()),
                title: self.title.filter(|s| !s.is_empty()),
                publication_date: self.publication_date,
            },
            PageRequest::new(self.page, self.page_size),
        )
    }
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /books - Insert a new book, using the ISBN as primary key
pub async fn create_book(
    State(state): State<Arc<BookState>>,
    JsonBody(new): JsonBody<NewBook>,
) -> ApiResult<impl IntoResponse> {
    let book = state.repository.create(new).await?;
    tracing::info!(isbn = %book.isbn, "Book created");
    Ok((StatusCode::CREATED, Json(book)))
}

/// GET /books - List books, oldest first, paginated and filtered
pub async fn list_books(
    State(state): State<Arc<BookState>>,
    Query(query): Query<ListBooksQuery>,
) -> ApiResult<impl IntoResponse> {
    let (filter, page) = query.into_parts();
    let books = state.repository.list(&filter, page).await?;
    Ok(Json(books))
}

/// GET /books/:isbn - Retrieve a book, enriched with external catalog data
///
/// Enrichment failures never fail the read; the book is returned without
/// the enrichment field.
pub async fn retrieve_book(
    State(state): State<Arc<BookState>>,
    Path(isbn): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let book = state
        .repository
        .get(&isbn)
        .await?
        .ok_or_else(|| ApiError::book_not_found(&isbn))?;

    let mut body = serde_json::to_value(&book)
        .map_err(|e| ApiError::internal_error(format!("Failed to serialize book: {}", e)))?;
    merge_enrichment(&mut body, state.enrichment.fetch(&book.isbn).await);

    Ok(Json(body))
}

/// PUT /books/:isbn - Replace every field of a book except its ISBN
pub async fn update_book(
    State(state): State<Arc<BookState>>,
    Path(isbn): Path<String>,
    JsonBody(changes): JsonBody<BookChanges>,
) -> ApiResult<impl IntoResponse> {
    let book = state
        .repository
        .update(&isbn, &changes, WriteMode::Replace)
        .await?;
    tracing::info!(isbn = %book.isbn, "Book replaced");
    Ok(Json(book))
}

/// PATCH /books/:isbn - Update only the fields present in the body
pub async fn partial_update_book(
    State(state): State<Arc<BookState>>,
    Path(isbn): Path<String>,
    JsonBody(changes): JsonBody<BookChanges>,
) -> ApiResult<impl IntoResponse> {
    let book = state
        .repository
        .update(&isbn, &changes, WriteMode::Partial)
        .await?;
    tracing::info!(isbn = %book.isbn, "Book updated");
    Ok(Json(book))
}

/// DELETE /books/:isbn - Delete a book
pub async fn destroy_book(
    State(state): State<Arc<BookState>>,
    Path(isbn): Path<String>,
) -> ApiResult<impl IntoResponse> {
    if state.repository.delete(&isbn).await? {
        tracing::info!(isbn = %isbn, "Book deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::book_not_found(&isbn))
    }
}

// ============================================================================
// WRITE GUARD
// ============================================================================

/// Rejects book writes that would fail validation, before the cached read
/// is invalidated.
///
/// `PUT` must carry every field but the isbn; `PATCH` any subset. A body
/// isbn that differs from the path is rejected. Other methods pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookWriteGuard;

#[async_trait]
impl WriteGuard for BookWriteGuard {
    async fn check(&self, parts: &mut Parts, body: &Bytes) -> ApiResult<()> {
        let mode = match parts.method {
            Method::PUT => WriteMode::Replace,
            Method::PATCH => WriteMode::Partial,
            _ => return Ok(()),
        };

        let Path(isbn) = Path::<String>::from_request_parts(parts, &())
            .await
            .map_err(|e| ApiError::invalid_input(format!("Invalid path: {}", e)))?;

        let changes: BookChanges = serde_json::from_slice(body)?;
        changes.validate(&isbn, mode)?;
        Ok(())
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Detail operations on `/books/:isbn`, by name.
pub fn detail_operations() -> OperationTable<Arc<BookState>> {
    OperationTable::new()
        .register(RETRIEVE, get(retrieve_book))
        .register(UPDATE, put(update_book))
        .register(PARTIAL_UPDATE, patch(partial_update_book))
        .register(DESTROY, delete(destroy_book))
}

/// Cache binding for book detail routes.
pub fn detail_cache_binding() -> CacheBinding {
    CacheBinding::detail_with_reset_on_update()
        .invalidate_on([DESTROY])
        .with_write_guard(Arc::new(BookWriteGuard))
}

/// Create the book router with the response cache bound to its detail
/// operations.
pub fn create_router(state: Arc<BookState>, cache: &DetailCache) -> ApiResult<Router> {
    let detail = cache.bind(detail_operations(), &detail_cache_binding())?;

    Ok(Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/:isbn", detail.into_method_router())
        .with_state(state))
}
