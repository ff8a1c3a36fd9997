//! # Userdesk
//!
//! Admin service for user records.
//!
//! Userdesk keeps a single table of users (name, email, password hash) and
//! exposes it through a small JSON API: list, edit, update, delete and
//! registration, plus bulk CSV import and timestamped CSV export.
//!
//! ## Features
//!
//! - SQLite persistence with versioned migrations
//! - Field validation (required, email format, uniqueness, password rules)
//! - CSV import that skips and reports invalid rows instead of aborting
//! - CSV export written to disk and served as a download
//! - Single binary: HTTP server plus import/export commands
//!
//! ## Example
//!
//! ```rust,ignore
//! use userdesk::io::{ImportOptions, ImportService};
//!
//! let service = ImportService::new(store, hasher, ImportOptions::default());
//! let report = service.import_from_path("users.csv".as_ref())?;
//! println!("{}", report.summary());
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod http;
pub mod io;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::AppConfig;
pub use models::{NewUser, Page, PageRequest, User, UserChanges, UserId};
pub use services::{PasswordHasher, UserService, ValidationErrors};
pub use storage::{SqliteUserStore, UserStore};

/// Error type for userdesk operations.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed arguments, unreadable CSV headers, bad config values |
/// | `Validation` | Form or upload fields fail their rules |
/// | `NotFound` | A user id does not exist |
/// | `Conflict` | A write would break email uniqueness |
/// | `OperationFailed` | I/O, `SQLite`, hashing or serialization failures |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// One or more fields failed validation.
    ///
    /// Displays the first message, which is what a form would surface first.
    #[error("{}", .0.first_message().unwrap_or("validation failed"))]
    Validation(ValidationErrors),

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The write conflicts with an existing record.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` database operations fail
    /// - Filesystem I/O errors occur
    /// - CSV reading or writing fails
    /// - Password hashing fails
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds an [`Error::OperationFailed`] from any displayable cause.
    pub fn operation(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for userdesk operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
///
/// ```rust
/// use userdesk::current_timestamp;
///
/// assert!(current_timestamp() > 0);
/// ```
#[must_use]
pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::OperationFailed {
            operation: "test".to_string(),
            cause: "failed".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'test' failed: failed");

        let err = Error::NotFound("user 7".to_string());
        assert_eq!(err.to_string(), "not found: user 7");
    }

    #[test]
    fn test_validation_error_displays_first_message() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "The email field is required.");
        errors.add("name", "The name field is required.");
        let err = Error::Validation(errors);
        assert_eq!(err.to_string(), "The email field is required.");
    }

    #[test]
    fn test_operation_helper() {
        let err = Error::operation("open_sqlite", "disk full");
        assert_eq!(err.to_string(), "operation 'open_sqlite' failed: disk full");
    }
}
