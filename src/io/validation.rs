//! Import row validation.
//!
//! Rows are checked in a fixed order and the first failure wins: required
//! fields, then email format, then uniqueness against the store.

use super::traits::ImportedUser;
use crate::services::is_valid_email;
use thiserror::Error;

/// Why an imported row was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowIssue {
    /// Name or email cell is empty.
    #[error("Name and email are required.")]
    MissingFields,
    /// Email cell is not a valid address.
    #[error("Invalid email format for '{0}'.")]
    InvalidEmail(String),
    /// Email is already owned by a stored user.
    #[error("Email '{0}' already exists.")]
    DuplicateEmail(String),
}

/// A skipped row and the reason it was skipped.
///
/// Displays as `Row N: <reason>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Row {row}: {issue}")]
pub struct RowError {
    /// Line number in the source file.
    pub row: usize,
    /// Reason.
    pub issue: RowIssue,
}

impl RowError {
    /// Creates a row error.
    #[must_use]
    pub const fn new(row: usize, issue: RowIssue) -> Self {
        Self { row, issue }
    }
}

/// Runs the checks that need no store access.
///
/// # Errors
///
/// Returns the first failing check as a [`RowError`].
pub fn validate_row(row: &ImportedUser) -> Result<(), RowError> {
    if row.name.trim().is_empty() || row.email.trim().is_empty() {
        return Err(RowError::new(row.row_number, RowIssue::MissingFields));
    }
    if !is_valid_email(row.email.trim()) {
        return Err(RowError::new(
            row.row_number,
            RowIssue::InvalidEmail(row.email.clone()),
        ));
    }
    Ok(())
}
