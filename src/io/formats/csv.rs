//! CSV format adapter for import/export.
//!
//! Imports map columns by header name; exports always use the fixed
//! `ID,Name,Email,Created At,Updated At` layout.

use super::format_timestamp;
use crate::io::traits::{ExportSink, ExportableUser, ImportSource, ImportedUser};
use crate::{Error, Result};
use secrecy::SecretString;
use std::io::{BufRead, Write};

/// Header row written to every export.
pub const EXPORT_HEADERS: [&str; 5] = ["ID", "Name", "Email", "Created At", "Updated At"];

/// CSV import source.
///
/// The first row is the header. Rows may be shorter or longer than the
/// header; missing cells read as empty.
pub struct CsvImportSource<R: BufRead> {
    reader: csv::Reader<R>,
    column_map: Option<ColumnMap>,
    rows_read: usize,
}

/// Maps CSV column indices to user fields.
#[derive(Debug, Default, PartialEq, Eq)]
struct ColumnMap {
    name: Option<usize>,
    email: Option<usize>,
    password: Option<usize>,
}

impl ColumnMap {
    /// Creates a column map from CSV headers.
    ///
    /// Returns `None` for an empty header row (an empty file).
    fn from_headers(headers: &csv::StringRecord) -> Result<Option<Self>> {
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Ok(None);
        }

        let mut map = Self::default();
        for (i, header) in headers.iter().enumerate() {
            match header.trim().to_lowercase().as_str() {
                "name" => map.name = map.name.or(Some(i)),
                "email" => map.email = map.email.or(Some(i)),
                "password" => map.password = map.password.or(Some(i)),
                _ => {},
            }
        }

        if map.name.is_none() || map.email.is_none() {
            return Err(Error::InvalidInput(
                "CSV header must contain 'name' and 'email' columns".to_string(),
            ));
        }

        Ok(Some(map))
    }
}

impl<R: BufRead> CsvImportSource<R> {
    /// Creates a new CSV import source.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be read or lacks the `name`
    /// or `email` column.
    pub fn new(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| Error::operation("read_csv_headers", e))?
            .clone();
        let column_map = ColumnMap::from_headers(&headers)?;

        Ok(Self {
            reader: csv_reader,
            column_map,
            rows_read: 0,
        })
    }

    fn parse_record(&self, map: &ColumnMap, record: &csv::StringRecord) -> ImportedUser {
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");

        let password = Some(cell(map.password))
            .filter(|p| !p.is_empty())
            .map(|p| SecretString::from(p.to_string()));

        ImportedUser {
            // Line 1 is the header.
            row_number: self.rows_read + 1,
            name: cell(map.name).to_string(),
            email: cell(map.email).to_string(),
            password,
        }
    }
}

impl<R: BufRead> ImportSource for CsvImportSource<R> {
    fn next(&mut self) -> Result<Option<ImportedUser>> {
        let Some(map) = self.column_map.as_ref() else {
            return Ok(None);
        };

        let mut record = csv::StringRecord::new();
        let has_record = self
            .reader
            .read_record(&mut record)
            .map_err(|e| Error::operation("read_csv", e))?;
        if !has_record {
            return Ok(None);
        }

        self.rows_read += 1;
        Ok(Some(self.parse_record(map, &record)))
    }
}

/// CSV export sink.
pub struct CsvExportSink<W: Write> {
    writer: csv::Writer<W>,
    headers_written: bool,
}

impl<W: Write> CsvExportSink<W> {
    /// Creates a new CSV export sink.
    #[must_use]
    pub fn new(writer: W) -> Self {
        let csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        Self {
            writer: csv_writer,
            headers_written: false,
        }
    }

    fn ensure_headers(&mut self) -> Result<()> {
        if !self.headers_written {
            self.writer
                .write_record(EXPORT_HEADERS)
                .map_err(|e| Error::operation("write_csv_headers", e))?;
            self.headers_written = true;
        }
        Ok(())
    }
}

impl<W: Write + Send> ExportSink for CsvExportSink<W> {
    fn write(&mut self, user: &ExportableUser) -> Result<()> {
        self.ensure_headers()?;

        self.writer
            .write_record([
                user.id.to_string().as_str(),
                &user.name,
                &user.email,
                &format_timestamp(user.created_at),
                &format_timestamp(user.updated_at),
            ])
            .map_err(|e| Error::operation("write_csv", e))
    }

    fn finalize(mut self: Box<Self>) -> Result<()> {
        self.ensure_headers()?;
        self.writer
            .flush()
            .map_err(|e| Error::operation("flush_csv", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Cursor;

    fn read_all(input: &'static str) -> Vec<ImportedUser> {
        let mut source = CsvImportSource::new(Cursor::new(input)).unwrap();
        let mut rows = Vec::new();
        while let Some(row) = source.next().unwrap() {
            rows.push(row);
        }
        rows
    }

    #[test]
    fn test_import_basic_csv() {
        let rows = read_all("name,email,password\nAda,ada@example.com,secret123\nBob,bob@example.com,\n");
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].row_number, 2);
        assert_eq!(rows[0].name, "Ada");
        assert_eq!(rows[0].email, "ada@example.com");
        assert_eq!(
            rows[0].password.as_ref().map(ExposeSecret::expose_secret),
            Some("secret123")
        );

        assert_eq!(rows[1].row_number, 3);
        assert!(rows[1].password.is_none());
    }

    #[test]
    fn test_import_header_order_case_and_extra_columns() {
        let rows = read_all(" Email , ID, NAME \nada@example.com,7,Ada\n");
        assert_eq!(rows[0].name, "Ada");
        assert_eq!(rows[0].email, "ada@example.com");
        assert!(rows[0].password.is_none());
    }

    #[test]
    fn test_import_short_rows_read_empty() {
        let rows = read_all("name,email,password\nAda\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Ada");
        assert_eq!(rows[0].email, "");
    }

    #[test]
    fn test_import_quoted_fields() {
        let rows = read_all("name,email\n\"Lovelace, Ada\",ada@example.com\n");
        assert_eq!(rows[0].name, "Lovelace, Ada");
    }

    #[test]
    fn test_import_missing_required_column() {
        let result = CsvImportSource::new(Cursor::new("name,phone\nAda,123\n"));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_import_empty_file_yields_nothing() {
        assert!(read_all("").is_empty());
    }

    #[test]
    fn test_export_csv() {
        let mut output = Vec::new();
        {
            let mut sink = CsvExportSink::new(&mut output);
            sink.write(&ExportableUser {
                id: 1,
                name: "Lovelace, Ada".to_string(),
                email: "ada@example.com".to_string(),
                created_at: 0,
                updated_at: 1_700_000_000,
            })
            .unwrap();
            Box::new(sink).finalize().unwrap();
        }

        let output = String::from_utf8(output).unwrap();
        let mut lines = output.lines();
        assert_eq!(lines.next(), Some("ID,Name,Email,Created At,Updated At"));
        assert_eq!(
            lines.next(),
            Some("1,\"Lovelace, Ada\",ada@example.com,1970-01-01 00:00:00,2023-11-14 22:13:20")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_export_empty_still_writes_header() {
        let mut output = Vec::new();
        Box::new(CsvExportSink::new(&mut output)).finalize().unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "ID,Name,Email,Created At,Updated At\n"
        );
    }
}
