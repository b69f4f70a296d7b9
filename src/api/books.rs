//! Book endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{ApiJson, ApiPath, ApiQuery};
use crate::{
    error::AppResult,
    models::book::{Book, BookFilter, BookInput, BookPage, BookQuery, NewBook},
    AppState,
};

/// List every book
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    responses(
        (status = 200, description = "All books", body = Vec<Book>)
    )
)]
pub async fn list_books(State(state): State<AppState>) -> AppResult<Json<Vec<Book>>> {
    tracing::info!("GET /api/books - listing all books");
    let books = state.services.catalog.get_all().await?;
    Ok(Json(books))
}

/// Search books with filters and pagination
#[utoipa::path(
    get,
    path = "/books/search",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "One page of matching books", body = BookPage),
        (status = 400, description = "Invalid page parameters", body = crate::error::ErrorResponse)
    )
)]
pub async fn search_books(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BookQuery>,
) -> AppResult<Json<BookPage>> {
    tracing::info!(?query, "GET /api/books/search");
    let catalog = &state.services.catalog;
    let filter = BookFilter::new(query.title.as_deref(), query.brand.as_deref(), query.year);
    let page = catalog
        .search(&filter, catalog.page_request(query.page, query.size))
        .await?;
    Ok(Json(page))
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Book>> {
    tracing::info!(id, "GET /api/books/{{id}}");
    let book = state.services.catalog.get_by_id(id).await?;
    Ok(Json(book))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = BookInput,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input or duplicate vendor code", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<BookInput>,
) -> AppResult<(StatusCode, Json<Book>)> {
    tracing::info!("POST /api/books - creating book");
    let book = NewBook::try_from(input).map_err(|e| {
        tracing::warn!("Rejected book payload: {}", e);
        e
    })?;
    let created = state.services.catalog.create(book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Partially update a book: only present fields are applied
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book ID")),
    request_body = BookInput,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Duplicate vendor code", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<BookInput>,
) -> AppResult<Json<Book>> {
    tracing::info!(id, "PUT /api/books/{{id}} - updating book");
    let updated = state.services.catalog.update(id, &input).await?;
    Ok(Json(updated))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    tracing::info!(id, "DELETE /api/books/{{id}}");
    state.services.catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    /// Vendor code to check
    pub vendor_code: String,
    /// Record allowed to own the code (the one being edited)
    pub exclude_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub vendor_code: String,
    pub available: bool,
}

/// Check whether a vendor code is free
#[utoipa::path(
    get,
    path = "/books/vendor-code-availability",
    tag = "books",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Availability of the vendor code", body = AvailabilityResponse)
    )
)]
pub async fn vendor_code_availability(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AvailabilityQuery>,
) -> AppResult<Json<AvailabilityResponse>> {
    let available = state
        .services
        .catalog
        .check_vendor_code_available(&query.vendor_code, query.exclude_id)
        .await?;
    Ok(Json(AvailabilityResponse {
        vendor_code: query.vendor_code,
        available,
    }))
}
