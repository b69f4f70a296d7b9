//! In-process book store for development mode and tests

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{duplicate_vendor_code, BookStore};
use crate::{
    error::AppResult,
    models::book::{Book, BookFilter, NewBook, PageRequest},
};

#[derive(Default)]
struct MemoryState {
    last_id: i64,
    books: BTreeMap<i64, Book>,
}

impl MemoryState {
    fn vendor_code_taken(&self, vendor_code: &str, excluded_id: Option<i64>) -> bool {
        self.books
            .values()
            .any(|b| b.vendor_code == vendor_code && Some(b.id) != excluded_id)
    }
}

/// Book store kept in a `BTreeMap` behind a single lock.
///
/// Uniqueness is checked while holding the write lock, so concurrent writers
/// cannot both claim the same vendor code.
#[derive(Default)]
pub struct InMemoryBooksRepository {
    state: RwLock<MemoryState>,
}

impl InMemoryBooksRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for InMemoryBooksRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Book>> {
        Ok(self.state.read().await.books.get(&id).cloned())
    }

    async fn find_all(&self) -> AppResult<Vec<Book>> {
        Ok(self.state.read().await.books.values().cloned().collect())
    }

    async fn find_filtered(
        &self,
        filter: &BookFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<Book>, i64)> {
        let state = self.state.read().await;
        let mut matches: Vec<&Book> = state.books.values().filter(|b| filter.matches(b)).collect();
        matches.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));

        let total = matches.len() as i64;
        let items = matches
            .into_iter()
            .skip(page.offset().max(0) as usize)
            .take(page.size.max(0) as usize)
            .cloned()
            .collect();
        Ok((items, total))
    }

    async fn find_by_vendor_code(&self, vendor_code: &str) -> AppResult<Option<Book>> {
        let state = self.state.read().await;
        Ok(state
            .books
            .values()
            .find(|b| b.vendor_code == vendor_code)
            .cloned())
    }

    async fn find_by_vendor_code_excluding(
        &self,
        vendor_code: &str,
        excluded_id: i64,
    ) -> AppResult<Option<Book>> {
        let state = self.state.read().await;
        Ok(state
            .books
            .values()
            .find(|b| b.vendor_code == vendor_code && b.id != excluded_id)
            .cloned())
    }

    async fn insert(&self, book: &NewBook, now: DateTime<Utc>) -> AppResult<Book> {
        let mut state = self.state.write().await;
        if state.vendor_code_taken(&book.vendor_code, None) {
            return Err(duplicate_vendor_code(&book.vendor_code));
        }

        state.last_id += 1;
        let record = Book {
            id: state.last_id,
            vendor_code: book.vendor_code.clone(),
            title: book.title.clone(),
            brand: book.brand.clone(),
            year: book.year,
            stock: book.stock,
            price: book.price,
            created_at: now,
            updated_at: now,
        };
        state.books.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, book: &Book) -> AppResult<Option<Book>> {
        let mut state = self.state.write().await;
        if state.vendor_code_taken(&book.vendor_code, Some(book.id)) {
            return Err(duplicate_vendor_code(&book.vendor_code));
        }

        let Some(stored) = state.books.get_mut(&book.id) else {
            return Ok(None);
        };
        let created_at = stored.created_at;
        *stored = Book {
            created_at,
            ..book.clone()
        };
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        Ok(self.state.write().await.books.remove(&id).is_some())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
