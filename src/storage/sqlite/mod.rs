//! `SQLite` storage backend.
//!
//! - [`connection`]: connection opening, pragmas, poison-recovering locks
//! - [`migrations`]: embedded, versioned schema migrations
//! - [`metrics`]: per-operation metrics recording
//! - [`users`]: the [`SqliteUserStore`] implementation

mod connection;
pub mod migrations;
mod metrics;
mod users;

pub use connection::{
    BUSY_TIMEOUT_MS, acquire_lock, configure_connection, open_connection, open_in_memory,
};
pub use metrics::{record_operation_metrics, status_label};
pub use users::SqliteUserStore;
