//! Vendor code uniqueness checks

use validator::{ValidationError, ValidationErrors};

use crate::{error::AppResult, models::book::BookInput, repository::Repository};

/// Answers whether a vendor code is already owned by another record.
///
/// This is the friendly early check; the store's unique constraint remains
/// the authoritative one.
#[derive(Clone)]
pub struct VendorCodeValidator {
    repository: Repository,
}

impl VendorCodeValidator {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// True when a record other than `exclude_id` already holds `vendor_code`
    pub async fn is_duplicate(&self, vendor_code: &str, exclude_id: Option<i64>) -> AppResult<bool> {
        let existing = match exclude_id {
            Some(id) => {
                self.repository
                    .books
                    .find_by_vendor_code_excluding(vendor_code, id)
                    .await?
            }
            None => self.repository.books.find_by_vendor_code(vendor_code).await?,
        };
        Ok(existing.is_some())
    }

    /// Form-time check: records a `vendor_code` field error when the code is taken
    pub async fn validate(
        &self,
        input: &BookInput,
        exclude_id: Option<i64>,
        errors: &mut ValidationErrors,
    ) -> AppResult<()> {
        let Some(vendor_code) = input.vendor_code.as_deref() else {
            return Ok(());
        };
        if self.is_duplicate(vendor_code, exclude_id).await? {
            errors.add("vendor_code", taken_error());
        }
        Ok(())
    }
}

/// Field error used whenever a vendor code collides with another record
pub fn taken_error() -> ValidationError {
    ValidationError::new("unique").with_message("This vendor code already exists".into())
}
