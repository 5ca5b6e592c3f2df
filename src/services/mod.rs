//! Business rules. Every function returns a typed `Result`; handlers only
//! translate HTTP in and out.

pub mod auth;
pub mod comment;
pub mod post;
pub mod thread;
pub mod user;

use crate::error::AppError;

/// Only the owner of a row may change it.
pub(crate) fn ensure_owner(owner_id: i64, caller_id: i64) -> Result<(), AppError> {
    if owner_id != caller_id {
        return Err(AppError::Forbidden("Forbidden".to_string()));
    }
    Ok(())
}

/// A supplied, non-blank replacement value.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
