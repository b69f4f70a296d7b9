//! Catalog management service

use chrono::{DateTime, Utc};

use super::uniqueness::VendorCodeValidator;
use crate::{
    config::CatalogConfig,
    error::{AppError, AppResult},
    models::book::{Book, BookFilter, BookInput, BookPage, NewBook, PageRequest},
    repository::{duplicate_vendor_code, Repository},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    vendor_codes: VendorCodeValidator,
    config: CatalogConfig,
}

impl CatalogService {
    pub fn new(repository: Repository, config: CatalogConfig) -> Self {
        Self {
            vendor_codes: VendorCodeValidator::new(repository.clone()),
            repository,
            config,
        }
    }

    /// Get a book by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<Book> {
        self.repository
            .books
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Every book, unfiltered and unpaginated
    pub async fn get_all(&self) -> AppResult<Vec<Book>> {
        self.repository.books.find_all().await
    }

    /// Build a page request, applying the configured default size
    pub fn page_request(&self, page: Option<i64>, size: Option<i64>) -> PageRequest {
        PageRequest {
            page: page.unwrap_or(0),
            size: size.unwrap_or(self.config.default_page_size),
        }
    }

    /// Search books with filters, ordered by title
    pub async fn search(&self, filter: &BookFilter, page: PageRequest) -> AppResult<BookPage> {
        if page.page < 0 {
            return Err(AppError::Validation("page must not be negative".to_string()));
        }
        if page.size < 1 || page.size > self.config.max_page_size {
            return Err(AppError::Validation(format!(
                "size must be between 1 and {}",
                self.config.max_page_size
            )));
        }
        if page.checked_offset().is_none() {
            return Err(AppError::Validation("page is out of range".to_string()));
        }

        let (items, total) = self.repository.books.find_filtered(filter, page).await?;
        Ok(BookPage::new(items, total, page))
    }

    /// Create a new book
    pub async fn create(&self, book: NewBook) -> AppResult<Book> {
        if self.vendor_codes.is_duplicate(&book.vendor_code, None).await? {
            return Err(duplicate_vendor_code(&book.vendor_code));
        }

        let created = self.repository.books.insert(&book, Utc::now()).await?;
        tracing::info!(id = created.id, vendor_code = %created.vendor_code, "Book created");
        Ok(created)
    }

    /// Apply a partial update: present fields that differ are overwritten
    pub async fn update(&self, id: i64, input: &BookInput) -> AppResult<Book> {
        input.validate_patch()?;
        let current = self.get_by_id(id).await?;

        if let Some(ref vendor_code) = input.vendor_code {
            if self.vendor_codes.is_duplicate(vendor_code, Some(id)).await? {
                return Err(duplicate_vendor_code(vendor_code));
            }
        }

        let merged = merge_book(&current, input, Utc::now());
        let updated = self
            .repository
            .books
            .update(&merged)
            .await?
            .ok_or_else(|| not_found(id))?;

        tracing::info!(id = updated.id, "Book updated");
        Ok(updated)
    }

    /// Delete a book permanently
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if !self.repository.books.delete(id).await? {
            return Err(not_found(id));
        }
        tracing::info!(id, "Book deleted");
        Ok(())
    }

    /// Whether `vendor_code` is free for a record other than `exclude_id`
    pub async fn check_vendor_code_available(
        &self,
        vendor_code: &str,
        exclude_id: Option<i64>,
    ) -> AppResult<bool> {
        Ok(!self.vendor_codes.is_duplicate(vendor_code, exclude_id).await?)
    }

    pub fn vendor_codes(&self) -> &VendorCodeValidator {
        &self.vendor_codes
    }

    /// Check the record store is reachable
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.books.ping().await
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Book with id {} not found", id))
}

/// Merge `input` over `current`. `updated_at` always moves to `now`.
pub fn merge_book(current: &Book, input: &BookInput, now: DateTime<Utc>) -> Book {
    fn pick<T: Clone + PartialEq>(current: &T, incoming: &Option<T>) -> T {
        match incoming {
            Some(value) if value != current => value.clone(),
            _ => current.clone(),
        }
    }

    Book {
        id: current.id,
        vendor_code: pick(&current.vendor_code, &input.vendor_code),
        title: pick(&current.title, &input.title),
        brand: pick(&current.brand, &input.brand),
        year: pick(&current.year, &input.year),
        stock: input.stock.or(current.stock),
        price: input.price.or(current.price),
        created_at: current.created_at,
        updated_at: now,
    }
}
