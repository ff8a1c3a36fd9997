//! Storage layer.
//!
//! User records live behind the [`UserStore`] trait. The only backend is
//! `SQLite` ([`SqliteUserStore`]), which owns schema migrations and records
//! per-operation metrics.

// Dropping the connection guard slightly earlier provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]

pub mod sqlite;
pub mod traits;

pub use sqlite::SqliteUserStore;
pub use traits::UserStore;
