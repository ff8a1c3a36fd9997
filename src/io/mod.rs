//! CSV import and export.
//!
//! # Architecture
//!
//! - **Format adapters** implement [`ImportSource`] and [`ExportSink`]
//! - **Row validation** decides which imported rows are skipped and why
//! - **Services** orchestrate upload handling, parsing and storage
//!
//! # Examples
//!
//! ## Import users from an upload
//!
//! ```rust,ignore
//! use userdesk::io::{ImportOptions, ImportService, UploadedFile};
//!
//! let service = ImportService::new(store, hasher, ImportOptions::default());
//! let report = service.import_upload(Some(&UploadedFile::new("users.csv", bytes)))?;
//! println!("{}", report.summary());
//! ```
//!
//! ## Export users
//!
//! ```rust,ignore
//! use userdesk::io::{ExportOptions, ExportService};
//!
//! let result = ExportService::new(store, ExportOptions::default()).export()?;
//! println!("Wrote {} users to {}", result.exported, result.path.display());
//! ```

pub mod formats;
pub mod services;
pub mod traits;
pub mod validation;

pub use formats::Format;
pub use services::export::{ExportOptions, ExportResult, ExportService, ExportedFile};
pub use services::import::{
    ImportOptions, ImportReport, ImportService, UPLOAD_FIELD, UploadedFile,
};
pub use traits::{ExportSink, ExportableUser, ImportSource, ImportedUser};
pub use validation::{RowError, RowIssue};
