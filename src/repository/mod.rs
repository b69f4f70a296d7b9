//! Repository layer: the book record store and its implementations

pub mod books;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookFilter, NewBook, PageRequest},
};

/// Persistence contract for book records.
///
/// Implementations are the authoritative enforcement point for vendor code
/// uniqueness: `insert` and `update` must fail with [`AppError::Conflict`]
/// when the write would duplicate another record's vendor code.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Book>>;

    /// All records, ascending id
    async fn find_all(&self) -> AppResult<Vec<Book>>;

    /// One page of matching records ordered by title, plus the total match count
    async fn find_filtered(
        &self,
        filter: &BookFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<Book>, i64)>;

    async fn find_by_vendor_code(&self, vendor_code: &str) -> AppResult<Option<Book>>;

    /// Like `find_by_vendor_code` but never returns the record `excluded_id`
    async fn find_by_vendor_code_excluding(
        &self,
        vendor_code: &str,
        excluded_id: i64,
    ) -> AppResult<Option<Book>>;

    /// Insert a new record; the store assigns the id and stamps both timestamps with `now`
    async fn insert(&self, book: &NewBook, now: DateTime<Utc>) -> AppResult<Book>;

    /// Persist every mutable field of `book`. Returns `None` when the record no longer exists.
    async fn update(&self, book: &Book) -> AppResult<Option<Book>>;

    /// Returns whether a record was removed
    async fn delete(&self, id: i64) -> AppResult<bool>;

    /// Connectivity probe for readiness checks
    async fn ping(&self) -> AppResult<()>;
}

/// Main repository struct holding the record stores
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookStore>,
}

impl Repository {
    /// Repository backed by PostgreSQL
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self::with_books(Arc::new(books::BooksRepository::new(pool)))
    }

    /// Repository backed by process memory
    pub fn in_memory() -> Self {
        Self::with_books(Arc::new(memory::InMemoryBooksRepository::new()))
    }

    pub fn with_books(books: Arc<dyn BookStore>) -> Self {
        Self { books }
    }
}

pub(crate) fn duplicate_vendor_code(vendor_code: &str) -> AppError {
    AppError::Conflict(format!(
        "A book with vendor code '{}' already exists",
        vendor_code
    ))
}
