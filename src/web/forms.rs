//! HTML form payloads and field-level error bookkeeping

use std::{collections::BTreeMap, str::FromStr};

use serde::Deserialize;
use validator::{ValidationError, ValidationErrors};

use crate::models::book::{Book, BookInput};

/// Raw book form as posted by the browser. Everything arrives as text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookForm {
    pub vendor_code: String,
    pub title: String,
    pub brand: String,
    pub year: String,
    pub stock: String,
    pub price: String,
}

impl BookForm {
    /// Convert to a [`BookInput`]; unparseable numbers are recorded in `errors`
    pub fn parse(&self, errors: &mut ValidationErrors) -> BookInput {
        BookInput {
            vendor_code: text(&self.vendor_code),
            title: text(&self.title),
            brand: text(&self.brand),
            year: number(&self.year, "year", errors),
            stock: number(&self.stock, "stock", errors),
            price: number(&self.price, "price", errors),
        }
    }
}

impl From<&Book> for BookForm {
    fn from(book: &Book) -> Self {
        Self {
            vendor_code: book.vendor_code.clone(),
            title: book.title.clone(),
            brand: book.brand.clone(),
            year: book.year.to_string(),
            stock: book.stock.map(|s| s.to_string()).unwrap_or_default(),
            price: book.price.map(|p| p.to_string()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

fn text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn number<T: FromStr>(raw: &str, field: &'static str, errors: &mut ValidationErrors) -> Option<T> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.add(
                field,
                ValidationError::new("number").with_message("must be a number".into()),
            );
            None
        }
    }
}

/// Error messages keyed by form field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    /// Replace this set's messages for every field `other` reports on
    pub fn override_with(&mut self, other: FieldErrors) {
        self.0.extend(other.0);
    }
}

impl From<&ValidationErrors> for FieldErrors {
    fn from(errors: &ValidationErrors) -> Self {
        let mut out = FieldErrors::default();
        for (field, errs) in errors.field_errors() {
            for e in errs {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                out.push(&field.to_string(), message);
            }
        }
        out
    }
}
