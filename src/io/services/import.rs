//! User import service.
//!
//! Validates an uploaded file, stores it under the imports directory, parses
//! it and creates one user per valid row. Invalid rows are skipped and
//! reported; they never abort the import.

use crate::io::formats::{Format, create_import_source};
use crate::io::traits::ImportSource;
use crate::io::validation::{RowError, RowIssue, validate_row};
use crate::models::NewUser;
use crate::services::{PasswordHasher, ValidationErrors};
use crate::storage::UserStore;
use crate::{Error, Result, current_timestamp};
use rand::Rng;
use rand::distributions::Alphanumeric;
use secrecy::SecretString;
use serde::Serialize;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Form field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "csv_file";

/// Password given to imported users whose row has none.
pub const DEFAULT_IMPORT_PASSWORD: &str = "password123";

/// Default upload size cap, in kilobytes.
pub const DEFAULT_MAX_UPLOAD_KB: u64 = 2048;

/// Number of row errors quoted in [`ImportReport::summary`].
pub const SUMMARY_ERROR_LIMIT: usize = 5;

const RANDOM_NAME_LENGTH: usize = 10;

/// Options for user import.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// File format to import from.
    pub format: Format,
    /// Directory uploads are written to while they are parsed.
    pub imports_dir: PathBuf,
    /// Largest accepted upload, in kilobytes.
    pub max_upload_kb: u64,
    /// Password for rows without one.
    pub default_password: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            format: Format::Csv,
            imports_dir: PathBuf::from("imports"),
            max_upload_kb: DEFAULT_MAX_UPLOAD_KB,
            default_password: DEFAULT_IMPORT_PASSWORD.to_string(),
        }
    }
}

impl ImportOptions {
    /// Sets the imports directory.
    #[must_use]
    pub fn with_imports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.imports_dir = dir.into();
        self
    }

    /// Sets the upload size cap.
    #[must_use]
    pub const fn with_max_upload_kb(mut self, kb: u64) -> Self {
        self.max_upload_kb = kb;
        self
    }

    /// Sets the password for rows without one.
    #[must_use]
    pub fn with_default_password(mut self, password: impl Into<String>) -> Self {
        self.default_password = password.into();
        self
    }
}

/// An uploaded file as received from a client.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    /// Client-supplied file name.
    pub filename: Option<String>,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Creates an upload.
    #[must_use]
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: Some(filename.into()),
            bytes: bytes.into(),
        }
    }
}

/// Result of an import operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Number of users created.
    pub imported: usize,
    /// Number of data rows read.
    pub processed: usize,
    /// Skipped rows, in file order.
    #[serde(serialize_with = "serialize_row_errors")]
    pub errors: Vec<RowError>,
}

impl ImportReport {
    /// Returns whether any row was skipped.
    #[must_use]
    pub const fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns the human-readable outcome.
    ///
    /// Quotes at most [`SUMMARY_ERROR_LIMIT`] row errors and counts the rest.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut message = format!("Successfully imported {} users.", self.imported);
        if self.errors.is_empty() {
            return message;
        }

        let quoted: Vec<String> = self
            .errors
            .iter()
            .take(SUMMARY_ERROR_LIMIT)
            .map(ToString::to_string)
            .collect();
        message.push_str(&format!(
            " {} rows had errors: {}",
            self.errors.len(),
            quoted.join(" ")
        ));

        let remaining = self.errors.len().saturating_sub(SUMMARY_ERROR_LIMIT);
        if remaining > 0 {
            message.push_str(&format!(" (and {remaining} more errors)"));
        }
        message
    }
}

fn serialize_row_errors<S: serde::Serializer>(
    errors: &[RowError],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}

/// Returns the message shown when an import fails as a whole.
#[must_use]
pub fn failure_message(err: &Error) -> String {
    format!("Failed to import users: {err}")
}

/// Service for importing users from external files.
pub struct ImportService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    options: ImportOptions,
}

impl ImportService {
    /// Creates a new import service.
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher, options: ImportOptions) -> Self {
        Self {
            store,
            hasher,
            options,
        }
    }

    /// Returns the options in use.
    #[must_use]
    pub const fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Checks an upload against the field rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] keyed by [`UPLOAD_FIELD`].
    pub fn validate_upload(&self, upload: Option<&UploadedFile>) -> Result<()> {
        let Some(upload) = upload else {
            return Err(upload_error("The csv file field is required."));
        };

        let accepted = self.options.format.accepted_extensions();
        let extension_ok = upload
            .filename
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| accepted.iter().any(|a| a.eq_ignore_ascii_case(ext)));
        if !extension_ok {
            return Err(upload_error(format!(
                "The csv file field must be a file of type: {}.",
                accepted.join(", ")
            )));
        }

        let max_bytes = self.options.max_upload_kb.saturating_mul(1024);
        if u64::try_from(upload.bytes.len()).unwrap_or(u64::MAX) > max_bytes {
            return Err(upload_error(format!(
                "The csv file field must not be greater than {} kilobytes.",
                self.options.max_upload_kb
            )));
        }

        Ok(())
    }

    /// Validates, stores, parses and removes an uploaded file.
    ///
    /// The stored copy is deleted whether or not parsing succeeds.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the upload fails its rules
    /// - any file-level error from storing or parsing the file
    #[instrument(skip(self, upload), fields(size = upload.map(|u| u.bytes.len())))]
    pub fn import_upload(&self, upload: Option<&UploadedFile>) -> Result<ImportReport> {
        self.validate_upload(upload)?;
        let Some(upload) = upload else {
            return Err(upload_error("The csv file field is required."));
        };

        let path = self.store_upload(&upload.bytes)?;
        let result = self.import_from_path(&path);

        if let Err(e) = std::fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove stored upload");
        }

        result
    }

    /// Imports users from a file on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsed, or if the
    /// store fails.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn import_from_path(&self, path: &Path) -> Result<ImportReport> {
        let file = std::fs::File::open(path).map_err(|e| Error::operation("open_import_file", e))?;
        self.import_from_reader(std::io::BufReader::new(file))
    }

    /// Imports users from a reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the store fails.
    pub fn import_from_reader<R: BufRead + 'static>(&self, reader: R) -> Result<ImportReport> {
        let mut source = create_import_source(reader, self.options.format)?;
        self.import_from_source(source.as_mut())
    }

    /// Imports users from a source.
    ///
    /// Rows are checked in order: required fields, email format, then
    /// uniqueness. Rows earlier in the same source count as existing users.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or the store fails.
    pub fn import_from_source(&self, source: &mut dyn ImportSource) -> Result<ImportReport> {
        let start = Instant::now();
        let default_password = SecretString::from(self.options.default_password.clone());
        let mut report = ImportReport::default();

        while let Some(row) = source.next()? {
            report.processed += 1;

            if let Err(row_error) = validate_row(&row) {
                report.errors.push(row_error);
                continue;
            }

            let email = row.email.trim();
            let duplicate = || {
                RowError::new(row.row_number, RowIssue::DuplicateEmail(row.email.clone()))
            };
            if self.store.email_exists(email, None)? {
                report.errors.push(duplicate());
                continue;
            }

            let password = row.password.as_ref().unwrap_or(&default_password);
            let hash = self.hasher.hash(password)?;
            match self.store.insert(&NewUser::new(row.name.trim(), email, hash)) {
                Ok(user) => {
                    report.imported += 1;
                    tracing::debug!(user.id = %user.id, row = row.row_number, "Imported user");
                },
                Err(Error::Conflict(_)) => report.errors.push(duplicate()),
                Err(e) => return Err(e),
            }
        }

        metrics::counter!("import_rows_total", "status" => "imported")
            .increment(report.imported as u64);
        metrics::counter!("import_rows_total", "status" => "skipped")
            .increment(report.errors.len() as u64);
        metrics::histogram!("import_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);

        tracing::info!(
            imported = report.imported,
            skipped = report.errors.len(),
            "User import finished"
        );
        Ok(report)
    }

    /// Writes upload bytes to `<imports_dir>/<unix-time>_<random>.csv`.
    fn store_upload(&self, bytes: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.options.imports_dir)
            .map_err(|e| Error::operation("create_imports_dir", e))?;

        let path = self.options.imports_dir.join(upload_file_name(current_timestamp()));
        std::fs::write(&path, bytes).map_err(|e| Error::operation("store_upload", e))?;
        tracing::debug!(path = %path.display(), "Stored upload");
        Ok(path)
    }
}

fn upload_error(message: impl Into<String>) -> Error {
    Error::Validation(ValidationErrors::single(UPLOAD_FIELD, message))
}

fn upload_file_name(timestamp: i64) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_NAME_LENGTH)
        .map(char::from)
        .collect();
    format!("{timestamp}_{suffix}.csv")
}
