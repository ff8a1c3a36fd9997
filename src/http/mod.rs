//! JSON API over the user services.
//!
//! | Method | Path | Action |
//! |--------|------|--------|
//! | GET | `/health` | liveness and user count |
//! | POST | `/register` | create a user |
//! | GET | `/users?page=N` | paginated listing |
//! | GET | `/users/{id}/edit` | user to edit |
//! | PUT | `/users/{id}` | update |
//! | GET | `/users/{id}/delete` | user to confirm deletion |
//! | DELETE | `/users/{id}` | delete |
//! | POST | `/users/import` | multipart CSV upload (`csv_file`) |
//! | GET | `/users/export` | CSV download |
//! | GET | `/users/exports` | previous exports |

mod error;
mod handlers;
mod server;

pub use error::ApiError;
pub use server::{router, serve};

use crate::config::AppConfig;
use crate::io::{ExportService, ImportService};
use crate::services::UserService;
use crate::storage::{SqliteUserStore, UserStore};
use crate::Result;
use std::sync::Arc;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    users: Arc<UserService>,
    imports: Arc<ImportService>,
    exports: Arc<ExportService>,
}

impl AppState {
    /// Creates state from prebuilt services.
    #[must_use]
    pub fn new(users: UserService, imports: ImportService, exports: ExportService) -> Self {
        Self {
            users: Arc::new(users),
            imports: Arc::new(imports),
            exports: Arc::new(exports),
        }
    }

    /// Wires every service to one store using the application config.
    ///
    /// # Errors
    ///
    /// Returns an error if the password cost is invalid.
    pub fn with_store(config: &AppConfig, store: Arc<dyn UserStore>) -> Result<Self> {
        let hasher = config.password_hasher()?;
        Ok(Self::new(
            UserService::new(Arc::clone(&store), hasher.clone()).with_per_page(config.per_page),
            ImportService::new(Arc::clone(&store), hasher, config.import_options()),
            ExportService::new(store, config.export_options()),
        ))
    }

    /// Opens the configured database and wires every service to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(config: &AppConfig) -> Result<Self> {
        let store: Arc<dyn UserStore> = Arc::new(SqliteUserStore::open(config.database_path())?);
        Self::with_store(config, store)
    }

    /// Returns the user service.
    #[must_use]
    pub fn users(&self) -> &UserService {
        &self.users
    }

    /// Returns the import service.
    #[must_use]
    pub fn imports(&self) -> &ImportService {
        &self.imports
    }

    /// Returns the export service.
    #[must_use]
    pub fn exports(&self) -> &ExportService {
        &self.exports
    }
}
