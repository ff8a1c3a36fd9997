//! Core traits for import/export operations.
//!
//! Defines the [`ImportSource`] and [`ExportSink`] traits that format adapters
//! implement.

use crate::Result;
use crate::models::User;
use secrecy::SecretString;
use serde::Serialize;

/// One data row read from an import file.
///
/// Cells are kept as read (trimmed); required-field and format checks happen
/// in [`crate::io::validation`], so a row with empty cells is still yielded.
#[derive(Debug, Default)]
pub struct ImportedUser {
    /// 1-based line number in the source file, counting the header as line 1.
    pub row_number: usize,
    /// Name cell.
    pub name: String,
    /// Email cell.
    pub email: String,
    /// Password cell, `None` when the column is missing or the cell is empty.
    pub password: Option<SecretString>,
}

impl ImportedUser {
    /// Creates a row with name and email.
    #[must_use]
    pub fn new(row_number: usize, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            row_number,
            name: name.into(),
            email: email.into(),
            password: None,
        }
    }

    /// Sets the password cell.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }
}

/// Source of imported users.
///
/// Implementations read rows from a specific format and yield them one at a
/// time for processing.
pub trait ImportSource {
    /// Reads the next row from the source.
    ///
    /// Returns `Ok(None)` when the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying file cannot be parsed.
    fn next(&mut self) -> Result<Option<ImportedUser>>;
}

/// User representation for export.
///
/// Carries only the columns written to export files; the password hash is
/// never exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportableUser {
    /// User id.
    pub id: i64,
    /// Name.
    pub name: String,
    /// Email.
    pub email: String,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: i64,
    /// Last update timestamp (Unix epoch seconds).
    pub updated_at: i64,
}

impl From<&User> for ExportableUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.get(),
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Sink for exported users.
///
/// # Lifecycle
///
/// 1. Create sink with output destination
/// 2. Call `write()` for each user
/// 3. Call `finalize()` to complete the export
pub trait ExportSink {
    /// Writes a single user to the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or I/O fails.
    fn write(&mut self, user: &ExportableUser) -> Result<()>;

    /// Finalizes the export, writing headers for empty exports and flushing
    /// buffers. Consumes the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if I/O fails.
    fn finalize(self: Box<Self>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserId;
    use secrecy::ExposeSecret;

    #[test]
    fn test_imported_user_builder() {
        let row = ImportedUser::new(2, "Ada", "ada@example.com").with_password("secret123");
        assert_eq!(row.row_number, 2);
        assert_eq!(row.name, "Ada");
        assert_eq!(
            row.password.as_ref().map(ExposeSecret::expose_secret),
            Some("secret123")
        );
    }

    #[test]
    fn test_exportable_user_from_user() {
        let user = User {
            id: UserId::new(3),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            created_at: 10,
            updated_at: 20,
        };
        let exported = ExportableUser::from(&user);
        assert_eq!(exported.id, 3);
        assert_eq!(exported.updated_at, 20);

        let json = serde_json::to_string(&exported).unwrap();
        assert!(!json.contains("argon2"));
    }
}
