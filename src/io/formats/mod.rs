//! Format adapters for import/export.
//!
//! Each format implements [`ImportSource`] and/or [`ExportSink`] traits.

pub mod csv;

use crate::Result;
use chrono::{DateTime, Utc};
use std::io::{BufRead, Write};

use super::traits::{ExportSink, ImportSource};

/// Layout of timestamps written to export files and listings.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Supported file formats for import/export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// Comma-separated values with a header row.
    #[default]
    Csv,
}

impl Format {
    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
        }
    }

    /// Returns the MIME type for this format.
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
        }
    }

    /// Returns the file extensions accepted for upload in this format.
    #[must_use]
    pub const fn accepted_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Csv => &["csv", "txt"],
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Formats Unix epoch seconds as `YYYY-MM-DD HH:MM:SS` (UTC).
///
/// Out-of-range values render as an empty string.
#[must_use]
pub fn format_timestamp(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

/// Creates an import source for the given format and reader.
///
/// # Errors
///
/// Returns an error if the header row cannot be read.
pub fn create_import_source<R: BufRead + 'static>(
    reader: R,
    format: Format,
) -> Result<Box<dyn ImportSource>> {
    match format {
        Format::Csv => Ok(Box::new(csv::CsvImportSource::new(reader)?)),
    }
}

/// Creates an export sink for the given format and writer.
///
/// # Errors
///
/// Returns an error if sink creation fails.
pub fn create_export_sink<W: Write + Send + 'static>(
    writer: W,
    format: Format,
) -> Result<Box<dyn ExportSink>> {
    match format {
        Format::Csv => Ok(Box::new(csv::CsvExportSink::new(writer))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_metadata() {
        assert_eq!(Format::Csv.extension(), "csv");
        assert_eq!(Format::Csv.mime_type(), "text/csv");
        assert_eq!(Format::Csv.to_string(), "csv");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14 22:13:20");
        assert_eq!(format_timestamp(i64::MAX), "");
    }
}
