//! End-to-end tests for cached book reads and invalidation on writes.

use std::sync::Arc;

use axum::async_trait;
use axum::http::{header, Method, StatusCode};
use bookshelf_api::{EnrichmentFailure, ENRICHMENT_FIELD};
use bookshelf_core::{Book, BookChanges, BookFilter, BookshelfResult, NewBook, Page, PageRequest, WriteMode};
use bookshelf_storage::{BookRepository, InMemoryBookRepository};
use bookshelf_test_utils::fixtures::new_book_json;
use bookshelf_test_utils::{lotr_new_book, LOTR_ISBN};
use serde_json::json;
use tokio::sync::Notify;

#[path = "support/app.rs"]
mod test_app_support;
#[path = "support/enrichment.rs"]
mod test_enrichment_support;

use test_app_support::{dummy_cache, get, memory_cache, send, test_router};
use test_enrichment_support::ScriptedEnrichment;

fn detail_uri() -> String {
    format!("/books/{}", LOTR_ISBN)
}

async fn seeded_repository() -> Arc<InMemoryBookRepository> {
    let repo = Arc::new(InMemoryBookRepository::new());
    repo.create(lotr_new_book())
        .await
        .expect("Failed to seed repository");
    repo
}

#[tokio::test]
async fn test_read_cached_until_partial_update() {
    let repo = seeded_repository().await;
    let enrichment = ScriptedEnrichment::returning(json!({ "key": "value1" }));
    let router = test_router(repo, enrichment.clone(), memory_cache());

    let first = get(&router, &detail_uri()).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.cache_status(), Some("MISS"));
    assert_eq!(first.json()[ENRICHMENT_FIELD], json!({ "key": "value1" }));
    assert_eq!(enrichment.calls(), 1);

    let second = get(&router, &detail_uri()).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.cache_status(), Some("HIT"));
    assert_eq!(second.body, first.body);
    assert_eq!(
        second.headers.get(header::CACHE_CONTROL).and_then(|v| v.to_str().ok()),
        Some("max-age=300")
    );
    assert_eq!(enrichment.calls(), 1);

    enrichment.set_payload(json!({ "key": "value2" }));
    let patch = send(
        &router,
        Method::PATCH,
        &detail_uri(),
        Some(json!({ "title": "Updated Title" })),
    )
    .await;
    assert_eq!(patch.status, StatusCode::OK);
    assert_eq!(patch.json()["title"], "Updated Title");

    let third = get(&router, &detail_uri()).await;
    assert_eq!(third.status, StatusCode::OK);
    assert_eq!(third.cache_status(), Some("MISS"));
    assert_eq!(third.json()[ENRICHMENT_FIELD], json!({ "key": "value2" }));
    assert_eq!(third.json()["title"], "Updated Title");
    assert_eq!(enrichment.calls(), 2);
}

#[tokio::test]
async fn test_full_update_invalidates() {
    let repo = seeded_repository().await;
    let enrichment = ScriptedEnrichment::returning(json!({ "key": "value1" }));
    let router = test_router(repo, enrichment.clone(), memory_cache());

    get(&router, &detail_uri()).await;
    let put = send(
        &router,
        Method::PUT,
        &detail_uri(),
        Some(json!({
            "title": "The Fellowship of the Ring",
            "author": "J.R.R. Tolkien",
            "description": "Book one",
            "publication_date": "1954-07-29",
        })),
    )
    .await;
    assert_eq!(put.status, StatusCode::OK);

    let after = get(&router, &detail_uri()).await;
    assert_eq!(after.cache_status(), Some("MISS"));
    assert_eq!(after.json()["title"], "The Fellowship of the Ring");
    assert_eq!(enrichment.calls(), 2);
}

#[tokio::test]
async fn test_incomplete_full_update_rejected_and_cache_kept() {
    let repo = seeded_repository().await;
    let enrichment = ScriptedEnrichment::returning(json!({ "key": "value1" }));
    let router = test_router(repo, enrichment.clone(), memory_cache());

    get(&router, &detail_uri()).await;
    let put = send(
        &router,
        Method::PUT,
        &detail_uri(),
        Some(json!({ "title": "Only a title" })),
    )
    .await;
    assert_eq!(put.status, StatusCode::BAD_REQUEST);

    let after = get(&router, &detail_uri()).await;
    assert_eq!(after.cache_status(), Some("HIT"));
    assert_eq!(after.json()["title"], "The Lord of the Rings");
}

#[tokio::test]
async fn test_isbn_change_rejected_without_invalidation() {
    let repo = seeded_repository().await;
    let enrichment = ScriptedEnrichment::returning(json!({ "key": "value1" }));
    let router = test_router(repo.clone(), enrichment.clone(), memory_cache());

    get(&router, &detail_uri()).await;
    let patch = send(
        &router,
        Method::PATCH,
        &detail_uri(),
        Some(json!({ "isbn": "9780547928227", "title": "Renamed" })),
    )
    .await;
    assert_eq!(patch.status, StatusCode::BAD_REQUEST);
    assert_eq!(patch.json()["details"]["field"], "isbn");

    let after = get(&router, &detail_uri()).await;
    assert_eq!(after.cache_status(), Some("HIT"));
    assert_eq!(enrichment.calls(), 1);

    let stored = repo.get(LOTR_ISBN).await.expect("lookup").expect("book exists");
    assert_eq!(stored.title, "The Lord of the Rings");
}

#[tokio::test]
async fn test_same_isbn_in_body_accepted() {
    let repo = seeded_repository().await;
    let router = test_router(repo, ScriptedEnrichment::returning(json!({})), memory_cache());

    let patch = send(
        &router,
        Method::PATCH,
        &detail_uri(),
        Some(json!({ "isbn": LOTR_ISBN, "description": "Revised" })),
    )
    .await;
    assert_eq!(patch.status, StatusCode::OK);
    assert_eq!(patch.json()["description"], "Revised");
}

#[tokio::test]
async fn test_not_found_is_not_cached() {
    let repo = Arc::new(InMemoryBookRepository::new());
    let enrichment = ScriptedEnrichment::returning(json!({ "key": "value1" }));
    let router = test_router(repo, enrichment.clone(), memory_cache());

    let missing = get(&router, &detail_uri()).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.cache_status(), None);

    let created = send(&router, Method::POST, "/books", Some(new_book_json(&lotr_new_book()))).await;
    assert_eq!(created.status, StatusCode::CREATED);

    let found = get(&router, &detail_uri()).await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.cache_status(), Some("MISS"));
    assert_eq!(enrichment.calls(), 1);
}

#[tokio::test]
async fn test_delete_invalidates() {
    let repo = seeded_repository().await;
    let router = test_router(
        repo,
        ScriptedEnrichment::returning(json!({ "key": "value1" })),
        memory_cache(),
    );

    assert_eq!(get(&router, &detail_uri()).await.status, StatusCode::OK);
    let deleted = send(&router, Method::DELETE, &detail_uri(), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    assert_eq!(get(&router, &detail_uri()).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dummy_backend_never_hits() {
    let repo = seeded_repository().await;
    let enrichment = ScriptedEnrichment::returning(json!({ "key": "value1" }));
    let router = test_router(repo, enrichment.clone(), dummy_cache());

    for _ in 0..3 {
        let response = get(&router, &detail_uri()).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.cache_status(), Some("MISS"));
    }
    assert_eq!(enrichment.calls(), 3);
}

#[tokio::test]
async fn test_each_enrichment_failure_kind_keeps_read_ok() {
    let failures = [
        EnrichmentFailure::Connect("connection refused".to_string()),
        EnrichmentFailure::Timeout("deadline elapsed".to_string()),
        EnrichmentFailure::Http("too many redirects".to_string()),
        EnrichmentFailure::Decode("expected value at line 1 column 1".to_string()),
    ];

    for failure in failures {
        let kind = failure.kind();
        let repo = seeded_repository().await;
        let enrichment = ScriptedEnrichment::failing(failure);
        let router = test_router(repo, enrichment.clone(), memory_cache());

        let response = get(&router, &detail_uri()).await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", kind);
        assert_eq!(response.cache_status(), Some("MISS"), "{:?}", kind);
        assert_eq!(response.json()["isbn"], LOTR_ISBN, "{:?}", kind);
        assert!(response.json().get(ENRICHMENT_FIELD).is_none(), "{:?}", kind);
        assert_eq!(enrichment.calls(), 1, "{:?}", kind);

        let cached = get(&router, &detail_uri()).await;
        assert_eq!(cached.cache_status(), Some("HIT"), "{:?}", kind);
        assert_eq!(enrichment.calls(), 1, "{:?}", kind);
    }
}

#[tokio::test]
async fn test_concurrent_misses_both_run_handler() {
    let repo = seeded_repository().await;
    let enrichment = ScriptedEnrichment::gated(json!({ "key": "value1" }), 2);
    let router = test_router(repo, enrichment.clone(), memory_cache());

    let uri = detail_uri();
    let (a, b) = tokio::join!(get(&router, &uri), get(&router, &uri));
    assert_eq!(a.cache_status(), Some("MISS"));
    assert_eq!(b.cache_status(), Some("MISS"));
    assert_eq!(a.body, b.body);
    assert_eq!(enrichment.calls(), 2);
}

// ============================================================================
// READ DURING WRITE
// ============================================================================

/// Repository whose updates stop after being entered until released.
struct PausingRepository {
    inner: InMemoryBookRepository,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl BookRepository for PausingRepository {
    async fn create(&self, new: NewBook) -> BookshelfResult<Book> {
        self.inner.create(new).await
    }

    async fn get(&self, isbn: &str) -> BookshelfResult<Option<Book>> {
        self.inner.get(isbn).await
    }

    async fn list(&self, filter: &BookFilter, page: PageRequest) -> BookshelfResult<Page<Book>> {
        self.inner.list(filter, page).await
    }

    async fn update(&self, isbn: &str, changes: &BookChanges, mode: WriteMode) -> BookshelfResult<Book> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.update(isbn, changes, mode).await
    }

    async fn delete(&self, isbn: &str) -> BookshelfResult<bool> {
        self.inner.delete(isbn).await
    }
}

/// A read that lands between invalidation and mutation repopulates the
/// cache with the old record, which then outlives the write until the TTL.
#[tokio::test]
async fn test_read_between_invalidation_and_mutation_serves_stale() {
    let inner = InMemoryBookRepository::new();
    inner.create(lotr_new_book()).await.expect("Failed to seed repository");
    let repo = Arc::new(PausingRepository {
        inner,
        entered: Notify::new(),
        release: Notify::new(),
    });
    let enrichment = ScriptedEnrichment::returning(json!({ "key": "value1" }));
    let router = test_router(repo.clone(), enrichment.clone(), memory_cache());

    assert_eq!(get(&router, &detail_uri()).await.cache_status(), Some("MISS"));

    let writer = {
        let router = router.clone();
        tokio::spawn(async move {
            send(
                &router,
                Method::PATCH,
                &detail_uri(),
                Some(json!({ "title": "Updated Title" })),
            )
            .await
        })
    };
    repo.entered.notified().await;

    let during = get(&router, &detail_uri()).await;
    assert_eq!(during.cache_status(), Some("MISS"));
    assert_eq!(during.json()["title"], "The Lord of the Rings");

    repo.release.notify_one();
    let patch = writer.await.expect("writer task panicked");
    assert_eq!(patch.status, StatusCode::OK);

    let after = get(&router, &detail_uri()).await;
    assert_eq!(after.cache_status(), Some("HIT"));
    assert_eq!(after.json()["title"], "The Lord of the Rings");

    let stored = repo.get(LOTR_ISBN).await.expect("lookup").expect("book exists");
    assert_eq!(stored.title, "Updated Title");
}
