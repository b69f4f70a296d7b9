//! Book record model and the payloads that create, patch and query it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::AppError;

/// Persisted book record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    /// Globally unique vendor code
    pub vendor_code: String,
    pub title: String,
    pub brand: String,
    pub year: i32,
    pub stock: Option<i32>,
    #[schema(value_type = Option<String>, example = "19.99")]
    pub price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create / update request payload.
///
/// Every field is optional on the wire: creation runs [`Validate`] to enforce
/// the required ones, while updates treat each present field as an override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    #[validate(
        required(message = "vendorCode is required"),
        length(min = 1, max = 50, message = "vendorCode must be 1 to 50 characters"),
        custom(function = "not_blank")
    )]
    pub vendor_code: Option<String>,

    #[validate(
        required(message = "title is required"),
        length(min = 1, max = 200, message = "title must be 1 to 200 characters"),
        custom(function = "not_blank")
    )]
    pub title: Option<String>,

    #[validate(
        required(message = "brand is required"),
        length(min = 1, max = 50, message = "brand must be 1 to 50 characters"),
        custom(function = "not_blank")
    )]
    pub brand: Option<String>,

    #[validate(required(message = "year is required"))]
    pub year: Option<i32>,

    pub stock: Option<i32>,

    #[schema(value_type = Option<String>, example = "19.99")]
    pub price: Option<Decimal>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}

/// Field rules for an update: the same bounds as [`BookInput`], nothing required
#[derive(Debug, Validate)]
struct BookPatch {
    #[validate(
        length(min = 1, max = 50, message = "vendorCode must be 1 to 50 characters"),
        custom(function = "not_blank")
    )]
    vendor_code: Option<String>,

    #[validate(
        length(min = 1, max = 200, message = "title must be 1 to 200 characters"),
        custom(function = "not_blank")
    )]
    title: Option<String>,

    #[validate(
        length(min = 1, max = 50, message = "brand must be 1 to 50 characters"),
        custom(function = "not_blank")
    )]
    brand: Option<String>,
}

impl BookInput {
    /// Check only the fields this input carries
    pub fn validate_patch(&self) -> Result<(), ValidationErrors> {
        BookPatch {
            vendor_code: self.vendor_code.clone(),
            title: self.title.clone(),
            brand: self.brand.clone(),
        }
        .validate()
    }
}

/// A book that passed creation validation
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub vendor_code: String,
    pub title: String,
    pub brand: String,
    pub year: i32,
    pub stock: Option<i32>,
    pub price: Option<Decimal>,
}

impl TryFrom<BookInput> for NewBook {
    type Error = AppError;

    fn try_from(input: BookInput) -> Result<Self, Self::Error> {
        input.validate()?;
        match input {
            BookInput {
                vendor_code: Some(vendor_code),
                title: Some(title),
                brand: Some(brand),
                year: Some(year),
                stock,
                price,
            } => Ok(NewBook {
                vendor_code,
                title,
                brand,
                year,
                stock,
                price,
            }),
            _ => Err(AppError::Validation("Missing required book fields".to_string())),
        }
    }
}

impl From<&Book> for BookInput {
    fn from(book: &Book) -> Self {
        Self {
            vendor_code: Some(book.vendor_code.clone()),
            title: Some(book.title.clone()),
            brand: Some(book.brand.clone()),
            year: Some(book.year),
            stock: book.stock,
            price: book.price,
        }
    }
}

/// Catalog search query parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive substring of the title
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub title: Option<String>,
    /// Case-insensitive substring of the brand
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub brand: Option<String>,
    /// Exact publication year
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub year: Option<i32>,
    /// Zero-based page index (default: 0)
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<i64>,
    /// Page size (default: 10)
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub size: Option<i64>,
}

/// Normalised search predicates; `None` matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub title: Option<String>,
    pub brand: Option<String>,
    pub year: Option<i32>,
}

impl BookFilter {
    pub fn new(title: Option<&str>, brand: Option<&str>, year: Option<i32>) -> Self {
        fn clean(s: Option<&str>) -> Option<String> {
            s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
        }
        Self {
            title: clean(title),
            brand: clean(brand),
            year,
        }
    }

    /// Evaluate the predicates against a record
    pub fn matches(&self, book: &Book) -> bool {
        fn contains_ci(haystack: &str, needle: &Option<String>) -> bool {
            needle
                .as_ref()
                .map_or(true, |n| haystack.to_lowercase().contains(&n.to_lowercase()))
        }
        contains_ci(&book.title, &self.title)
            && contains_ci(&book.brand, &self.brand)
            && self.year.map_or(true, |y| book.year == y)
    }
}

/// Zero-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    /// Rows to skip, or `None` when the index is out of range
    pub fn checked_offset(&self) -> Option<i64> {
        self.page.checked_mul(self.size)
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.size)
    }
}

/// One page of search results
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookPage {
    pub items: Vec<Book>,
    /// Total number of matching records
    pub total: i64,
    /// Zero-based page index
    pub page: i64,
    pub size: i64,
    pub total_pages: i64,
}

impl BookPage {
    pub fn new(items: Vec<Book>, total: i64, request: PageRequest) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + request.size - 1) / request.size
        };
        Self {
            items,
            total,
            page: request.page,
            size: request.size,
            total_pages,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page.saturating_add(1) < self.total_pages
    }
}

/// Deserialize blank query/form values as `None` instead of failing to parse them
pub fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let opt = Option::<String>::deserialize(de)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => FromStr::from_str(s).map_err(de::Error::custom).map(Some),
    }
}
