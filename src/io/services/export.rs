//! User export service.
//!
//! Writes every user to a timestamped file under the exports directory and
//! lists previously written exports.

use crate::io::formats::{Format, TIMESTAMP_FORMAT, create_export_sink};
use crate::io::traits::{ExportSink, ExportableUser};
use crate::storage::UserStore;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Options for user export.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// File format to export to.
    pub format: Format,
    /// Directory export files are written to.
    pub exports_dir: PathBuf,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: Format::Csv,
            exports_dir: PathBuf::from("private").join("exports"),
        }
    }
}

impl ExportOptions {
    /// Sets the exports directory.
    #[must_use]
    pub fn with_exports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.exports_dir = dir.into();
        self
    }
}

/// Result of an export operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportResult {
    /// Number of users written.
    pub exported: usize,
    /// Format used for export.
    #[serde(skip)]
    pub format: Format,
    /// File name, suitable for a download disposition.
    pub filename: String,
    /// Full path of the written file.
    pub path: PathBuf,
}

/// A previously written export file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedFile {
    /// File name.
    pub filename: String,
    /// Full path.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Last-modified time, `YYYY-MM-DD HH:MM:SS` (UTC).
    pub created_at: String,
    #[serde(skip)]
    modified: i64,
}

/// Returns the message shown when an export fails.
#[must_use]
pub fn failure_message(err: &Error) -> String {
    format!("Export failed: {err}")
}

/// Builds `users_export_<YYYY-MM-DD_HH-MM-SS>.<ext>` for a moment in time.
#[must_use]
pub fn export_file_name(at: DateTime<Utc>, format: Format) -> String {
    format!(
        "users_export_{}.{}",
        at.format("%Y-%m-%d_%H-%M-%S"),
        format.extension()
    )
}

/// Service for exporting users to files.
pub struct ExportService {
    store: Arc<dyn UserStore>,
    options: ExportOptions,
}

impl ExportService {
    /// Creates a new export service.
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, options: ExportOptions) -> Self {
        Self { store, options }
    }

    /// Returns the options in use.
    #[must_use]
    pub const fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Exports every user to a new timestamped file in the exports directory.
    ///
    /// The file is kept on disk after the call.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written or the
    /// store fails.
    #[instrument(skip(self))]
    pub fn export(&self) -> Result<ExportResult> {
        std::fs::create_dir_all(&self.options.exports_dir)
            .map_err(|e| Error::operation("create_exports_dir", e))?;

        let filename = export_file_name(Utc::now(), self.options.format);
        let path = self.options.exports_dir.join(&filename);
        self.export_to_file(&path)
    }

    /// Exports every user to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the store fails.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn export_to_file(&self, path: &Path) -> Result<ExportResult> {
        let file =
            std::fs::File::create(path).map_err(|e| Error::operation("create_export_file", e))?;
        let exported = self.export_to_writer(std::io::BufWriter::new(file))?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::info!(
            path = %path.display(),
            format = %self.options.format,
            exported,
            "Users exported"
        );

        Ok(ExportResult {
            exported,
            format: self.options.format,
            filename,
            path: path.to_path_buf(),
        })
    }

    /// Exports every user to a writer. Returns the number of users written.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or the store fails.
    pub fn export_to_writer<W: Write + Send + 'static>(&self, writer: W) -> Result<usize> {
        let mut sink = create_export_sink(writer, self.options.format)?;
        let exported = self.export_to_sink(sink.as_mut())?;
        sink.finalize()?;
        Ok(exported)
    }

    /// Writes every user to a sink without finalizing it.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or the store fails.
    pub fn export_to_sink(&self, sink: &mut dyn ExportSink) -> Result<usize> {
        let start = Instant::now();
        let users = self.store.all()?;
        for user in &users {
            sink.write(&ExportableUser::from(user))?;
        }

        metrics::counter!("export_users_total").increment(users.len() as u64);
        metrics::histogram!("export_duration_ms").record(start.elapsed().as_secs_f64() * 1000.0);
        Ok(users.len())
    }

    /// Lists files in the exports directory, newest first.
    ///
    /// A missing directory yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be read.
    #[instrument(skip(self))]
    pub fn list_exports(&self) -> Result<Vec<ExportedFile>> {
        let dir = &self.options.exports_dir;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(dir).map_err(|e| Error::operation("list_exports", e))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::operation("list_exports", e))?;
            let metadata = entry
                .metadata()
                .map_err(|e| Error::operation("stat_export", e))?;
            if !metadata.is_file() {
                continue;
            }

            let modified: DateTime<Utc> = metadata
                .modified()
                .map_or_else(|_| DateTime::<Utc>::default(), DateTime::from);
            files.push(ExportedFile {
                filename: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
                size: metadata.len(),
                created_at: modified.format(TIMESTAMP_FORMAT).to_string(),
                modified: modified.timestamp(),
            });
        }

        files.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.filename.cmp(&a.filename))
        });
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::storage::SqliteUserStore;
    use chrono::TimeZone;

    fn service(dir: &Path) -> (ExportService, Arc<SqliteUserStore>) {
        let store = Arc::new(SqliteUserStore::in_memory().unwrap());
        let service = ExportService::new(
            store.clone(),
            ExportOptions::default().with_exports_dir(dir.join("private").join("exports")),
        );
        (service, store)
    }

    #[test]
    fn test_export_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            export_file_name(at, Format::Csv),
            "users_export_2024-03-09_07-05-01.csv"
        );
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let (service, store) = service(dir.path());
        store
            .insert(&NewUser::new("Ada", "ada@example.com", "hash-a"))
            .unwrap();
        store
            .insert(&NewUser::new("Bob", "bob@example.com", "hash-b"))
            .unwrap();

        let result = service.export().unwrap();
        assert_eq!(result.exported, 2);
        assert!(result.filename.starts_with("users_export_"));
        assert!(result.path.starts_with(dir.path()));

        let contents = std::fs::read_to_string(&result.path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "ID,Name,Email,Created At,Updated At");
        assert!(lines[1].starts_with("1,Ada,ada@example.com,"));
        assert!(lines[2].starts_with("2,Bob,bob@example.com,"));
        assert!(!contents.contains("hash-a"));
    }

    #[test]
    fn test_export_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(dir.path());
        let result = service.export().unwrap();
        assert_eq!(result.exported, 0);
        assert_eq!(
            std::fs::read_to_string(&result.path).unwrap(),
            "ID,Name,Email,Created At,Updated At\n"
        );
    }

    #[test]
    fn test_list_exports_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(dir.path());
        assert!(service.list_exports().unwrap().is_empty());
    }

    #[test]
    fn test_list_exports_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(dir.path());
        let exports_dir = &service.options().exports_dir;
        std::fs::create_dir_all(exports_dir).unwrap();

        let old = exports_dir.join("users_export_2020-01-01_00-00-00.csv");
        let new = exports_dir.join("users_export_2024-01-01_00-00-00.csv");
        std::fs::write(&old, "old").unwrap();
        std::fs::write(&new, "newer").unwrap();
        std::fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000))
            .unwrap();

        let files = service.list_exports().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].filename, "users_export_2024-01-01_00-00-00.csv");
        assert_eq!(files[0].size, 5);
        assert_eq!(files[1].created_at, "1970-01-01 00:16:40");
    }

    #[test]
    fn test_failure_message() {
        let err = Error::operation("create_export_file", "permission denied");
        assert_eq!(
            failure_message(&err),
            "Export failed: operation 'create_export_file' failed: permission denied"
        );
    }
}
