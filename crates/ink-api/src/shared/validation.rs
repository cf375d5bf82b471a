//! Input validators. Messages are safe to return to clients.

use crate::shared::error::ApiError;

/// Require non-blank text of at most `max` characters.
///
/// Produces "`{label}` is required" or "`{label}` too long".
pub fn check_text(label: &str, text: &str, max: usize) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::validation(format!("{} is required", label)));
    }
    if text.chars().count() > max {
        return Err(ApiError::validation(format!("{} too long", label)));
    }
    Ok(())
}

/// Require a non-blank identifier field.
pub fn check_id(label: &str, id: &str) -> Result<(), ApiError> {
    if id.trim().is_empty() {
        return Err(ApiError::validation(format!("{} is required", label)));
    }
    Ok(())
}
