//! PostgreSQL book store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use super::{duplicate_vendor_code, BookStore};
use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookFilter, NewBook, PageRequest},
};

const BOOK_COLUMNS: &str =
    "id, vendor_code, title, brand, year, stock, price, created_at, updated_at";

/// Escape LIKE metacharacters so user input only ever matches literally
fn like_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Map a unique constraint violation on `books.vendor_code` to a conflict
fn map_write_error(err: sqlx::Error, vendor_code: &str) -> AppError {
    if let sqlx::Error::Database(ref db) = err {
        if db.is_unique_violation() {
            return duplicate_vendor_code(vendor_code);
        }
    }
    AppError::Database(err)
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE id = $1",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(book)
    }

    async fn find_all(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books ORDER BY id",
            BOOK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn find_filtered(
        &self,
        filter: &BookFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<Book>, i64)> {
        let where_clause = r#"
            ($1::text IS NULL OR title ILIKE '%' || $1 || '%' ESCAPE '\')
            AND ($2::text IS NULL OR brand ILIKE '%' || $2 || '%' ESCAPE '\')
            AND ($3::int IS NULL OR year = $3)
        "#;

        let title = filter.title.as_deref().map(like_escape);
        let brand = filter.brand.as_deref().map(like_escape);

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM books WHERE {}",
            where_clause
        ))
        .bind(&title)
        .bind(&brand)
        .bind(filter.year)
        .fetch_one(&self.pool)
        .await?;

        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE {} ORDER BY title, id LIMIT $4 OFFSET $5",
            BOOK_COLUMNS, where_clause
        ))
        .bind(&title)
        .bind(&brand)
        .bind(filter.year)
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((books, total))
    }

    async fn find_by_vendor_code(&self, vendor_code: &str) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE vendor_code = $1",
            BOOK_COLUMNS
        ))
        .bind(vendor_code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(book)
    }

    async fn find_by_vendor_code_excluding(
        &self,
        vendor_code: &str,
        excluded_id: i64,
    ) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE vendor_code = $1 AND id <> $2",
            BOOK_COLUMNS
        ))
        .bind(vendor_code)
        .bind(excluded_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(book)
    }

    async fn insert(&self, book: &NewBook, now: DateTime<Utc>) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (vendor_code, title, brand, year, stock, price, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&book.vendor_code)
        .bind(&book.title)
        .bind(&book.brand)
        .bind(book.year)
        .bind(book.stock)
        .bind(book.price)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &book.vendor_code))
    }

    async fn update(&self, book: &Book) -> AppResult<Option<Book>> {
        // created_at is never written after insert
        sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books SET
                vendor_code = $1,
                title = $2,
                brand = $3,
                year = $4,
                stock = $5,
                price = $6,
                updated_at = $7
            WHERE id = $8
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&book.vendor_code)
        .bind(&book.title)
        .bind(&book.brand)
        .bind(book.year)
        .bind(book.stock)
        .bind(book.price)
        .bind(book.updated_at)
        .bind(book.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &book.vendor_code))
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
