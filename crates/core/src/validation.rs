//! Field-level input checks shared by the directory and event services.
//!
//! Each helper returns [`CoreError::Validation`] naming the offending field so
//! the HTTP layer can surface it verbatim.

use validator::ValidateEmail;

use crate::error::CoreError;

/// Reject empty or whitespace-only required text fields.
pub fn require_text(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Validate an optional email address. `None` and blank strings are accepted.
pub fn optional_email(value: Option<&str>) -> Result<(), CoreError> {
    match value.map(str::trim) {
        Some(email) if !email.is_empty() && !email.validate_email() => Err(
            CoreError::Validation(format!("'{email}' is not a valid email address")),
        ),
        _ => Ok(()),
    }
}

/// Money amounts must be finite and not negative.
pub fn non_negative_amount(field: &str, value: f64) -> Result<(), CoreError> {
    if !value.is_finite() || value < 0.0 {
        return Err(CoreError::Validation(format!(
            "{field} must be a non-negative amount"
        )));
    }
    Ok(())
}
