//! Embedded `SQLite` schema migrations.
//!
//! Migrations are compiled into the binary and applied in version order when
//! the store opens. Applied versions are recorded in `schema_migrations`, so
//! reopening an up-to-date database is a no-op.

use crate::{Error, Result};
use rusqlite::{Connection, params};

/// A single migration with version and SQL.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Migration version (sequential, starting at 1).
    pub version: i64,
    /// Human-readable description.
    pub description: &'static str,
    /// SQL to apply (may contain multiple statements).
    pub sql: &'static str,
}

/// Migrations for the users database.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Create users table",
        sql: "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL COLLATE NOCASE UNIQUE,
                password TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );",
    },
    Migration {
        version: 2,
        description: "Index users by creation time",
        sql: "CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at DESC);",
    },
];

/// Maximum version across a set of migrations.
#[must_use]
pub fn max_version(migrations: &[Migration]) -> i64 {
    migrations.iter().map(|m| m.version).max().unwrap_or(0)
}

/// Returns the highest applied version, or 0 for a fresh database.
///
/// # Errors
///
/// Returns an error if the tracking table cannot be created or read.
pub fn current_version(conn: &Connection) -> Result<i64> {
    ensure_migrations_table(conn)?;
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| Error::operation("read_schema_version", e))
}

/// Applies every migration newer than the recorded version.
///
/// Each migration and its version record run in one transaction, so a failing
/// statement leaves the schema at the previous version.
///
/// # Errors
///
/// Returns an error naming the failing migration.
pub fn run(conn: &mut Connection, migrations: &[Migration]) -> Result<usize> {
    let current = current_version(conn)?;
    let mut applied = 0;

    for migration in migrations.iter().filter(|m| m.version > current) {
        apply(conn, migration)?;
        applied += 1;
    }

    Ok(applied)
}

fn ensure_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| Error::operation("create_migrations_table", e))?;
    Ok(())
}

fn apply(conn: &mut Connection, migration: &Migration) -> Result<()> {
    let failed = |e: rusqlite::Error| Error::OperationFailed {
        operation: format!("migration_v{}: {}", migration.version, migration.description),
        cause: e.to_string(),
    };

    let tx = conn.transaction().map_err(failed)?;
    tx.execute_batch(migration.sql).map_err(failed)?;
    tx.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        params![
            migration.version,
            migration.description,
            crate::current_timestamp()
        ],
    )
    .map_err(failed)?;
    tx.commit().map_err(failed)?;

    tracing::info!(
        version = migration.version,
        description = migration.description,
        "Applied migration"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_is_version_zero() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(current_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_run_applies_all_then_nothing() {
        let mut conn = Connection::open_in_memory().unwrap();
        let applied = run(&mut conn, MIGRATIONS).unwrap();
        assert_eq!(applied, MIGRATIONS.len());
        assert_eq!(current_version(&conn).unwrap(), max_version(MIGRATIONS));

        let applied_again = run(&mut conn, MIGRATIONS).unwrap();
        assert_eq!(applied_again, 0);
    }

    #[test]
    fn test_failed_migration_rolls_back() {
        const BROKEN: &[Migration] = &[
            Migration {
                version: 1,
                description: "ok",
                sql: "CREATE TABLE a (id INTEGER);",
            },
            Migration {
                version: 2,
                description: "broken",
                sql: "CREATE TABLE b (id INTEGER); NOT VALID SQL;",
            },
        ];

        let mut conn = Connection::open_in_memory().unwrap();
        let err = run(&mut conn, BROKEN).unwrap_err();
        assert!(err.to_string().contains("migration_v2"));
        assert_eq!(current_version(&conn).unwrap(), 1);

        let b_exists: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'b'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(b_exists, 0);
    }

    #[test]
    fn test_max_version() {
        assert_eq!(max_version(MIGRATIONS), 2);
        assert_eq!(max_version(&[]), 0);
    }
}
