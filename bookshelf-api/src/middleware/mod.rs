//! Middleware for the Bookshelf API.

pub mod cache;

pub use cache::{
    CacheBinding, DetailCache, OperationTable, WriteGuard, DESTROY, PARTIAL_UPDATE, RETRIEVE,
    UPDATE, X_CACHE,
};
