//! `SQLite`-backed user store.

use super::connection::{acquire_lock, open_connection, open_in_memory};
use super::metrics::{record_operation_metrics, status_label};
use super::migrations::{self, MIGRATIONS};
use crate::models::{NewUser, Page, PageRequest, User, UserChanges, UserId};
use crate::storage::traits::UserStore;
use crate::{Error, Result, current_timestamp};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::instrument;

const BACKEND: &str = "sqlite";

const SELECT_COLUMNS: &str = "SELECT id, name, email, password, created_at, updated_at FROM users";

/// `SQLite` user store.
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` because `rusqlite::Connection` is not `Sync`.
/// Requests are short and sequential; WAL mode lets an export read proceed
/// while a form update waits on the busy timeout rather than failing.
pub struct SqliteUserStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteUserStore {
    /// Opens (or creates) the database at `db_path` and applies migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = open_connection(&db_path)?;
        Self::from_connection(conn, Some(db_path))
    }

    /// Creates an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(open_in_memory()?, None)
    }

    fn from_connection(mut conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        let applied = migrations::run(&mut conn, MIGRATIONS)?;
        if applied > 0 {
            tracing::debug!(applied, "Database schema migrated");
        }
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Runs `op` against the locked connection and records its metrics.
    fn with_conn<T>(
        &self,
        operation: &'static str,
        op: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T> {
        let start = Instant::now();
        let result = {
            let conn = acquire_lock(&self.conn);
            op(&conn)
        };
        record_operation_metrics(BACKEND, operation, start, status_label(&result));
        result
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId::new(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Converts a write error, surfacing unique violations as conflicts.
fn write_error(operation: &str, email: &str, e: rusqlite::Error) -> Error {
    match e {
        rusqlite::Error::SqliteFailure(ref failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            Error::Conflict(format!("email '{email}' already exists"))
        },
        other => Error::operation(operation, other),
    }
}

fn fetch_by_id(conn: &Connection, id: UserId) -> Result<Option<User>> {
    conn.query_row(
        &format!("{SELECT_COLUMNS} WHERE id = ?1"),
        params![id.get()],
        user_from_row,
    )
    .optional()
    .map_err(|e| Error::operation("get_user", e))
}

fn count_rows(conn: &Connection) -> Result<usize> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .map_err(|e| Error::operation("count_users", e))?;
    Ok(usize::try_from(count).unwrap_or(0))
}

fn to_sql_int(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl UserStore for SqliteUserStore {
    #[instrument(skip(self, user), fields(operation = "insert", backend = "sqlite"))]
    fn insert(&self, user: &NewUser) -> Result<User> {
        self.with_conn("insert", |conn| {
            let now = current_timestamp();
            conn.execute(
                "INSERT INTO users (name, email, password, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![user.name, user.email, user.password_hash, now],
            )
            .map_err(|e| write_error("insert_user", &user.email, e))?;

            Ok(User {
                id: UserId::new(conn.last_insert_rowid()),
                name: user.name.clone(),
                email: user.email.clone(),
                password_hash: user.password_hash.clone(),
                created_at: now,
                updated_at: now,
            })
        })
    }

    #[instrument(skip(self), fields(operation = "get", backend = "sqlite", user.id = %id))]
    fn get(&self, id: UserId) -> Result<Option<User>> {
        self.with_conn("get", |conn| fetch_by_id(conn, id))
    }

    #[instrument(skip(self, email), fields(operation = "find_by_email", backend = "sqlite"))]
    fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_conn("find_by_email", |conn| {
            conn.query_row(
                &format!("{SELECT_COLUMNS} WHERE email = ?1"),
                params![email],
                user_from_row,
            )
            .optional()
            .map_err(|e| Error::operation("find_user_by_email", e))
        })
    }

    #[instrument(skip(self, email), fields(operation = "email_exists", backend = "sqlite"))]
    fn email_exists(&self, email: &str, except: Option<UserId>) -> Result<bool> {
        self.with_conn("email_exists", |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 AND (?2 IS NULL OR id != ?2))",
                params![email, except.map(UserId::get)],
                |row| row.get(0),
            )
            .map_err(|e| Error::operation("check_email_exists", e))
        })
    }

    #[instrument(skip(self, changes), fields(operation = "update", backend = "sqlite", user.id = %id))]
    fn update(&self, id: UserId, changes: &UserChanges) -> Result<Option<User>> {
        self.with_conn("update", |conn| {
            let now = current_timestamp();
            let updated = conn
                .execute(
                    "UPDATE users
                     SET name = ?1, email = ?2, password = COALESCE(?3, password), updated_at = ?4
                     WHERE id = ?5",
                    params![
                        changes.name,
                        changes.email,
                        changes.password_hash,
                        now,
                        id.get()
                    ],
                )
                .map_err(|e| write_error("update_user", &changes.email, e))?;

            if updated == 0 {
                return Ok(None);
            }
            fetch_by_id(conn, id)
        })
    }

    #[instrument(skip(self), fields(operation = "delete", backend = "sqlite", user.id = %id))]
    fn delete(&self, id: UserId) -> Result<bool> {
        self.with_conn("delete", |conn| {
            let deleted = conn
                .execute("DELETE FROM users WHERE id = ?1", params![id.get()])
                .map_err(|e| Error::operation("delete_user", e))?;
            Ok(deleted > 0)
        })
    }

    #[instrument(skip(self), fields(operation = "list", backend = "sqlite", page = request.page))]
    fn list(&self, request: PageRequest) -> Result<Page<User>> {
        self.with_conn("list", |conn| {
            let total = count_rows(conn)?;
            let mut stmt = conn
                .prepare(&format!("{SELECT_COLUMNS} ORDER BY id ASC LIMIT ?1 OFFSET ?2"))
                .map_err(|e| Error::operation("prepare_list_users", e))?;
            let items = stmt
                .query_map(
                    params![to_sql_int(request.per_page), to_sql_int(request.offset())],
                    user_from_row,
                )
                .map_err(|e| Error::operation("list_users", e))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| Error::operation("list_users", e))?;

            Ok(Page::new(items, request, total))
        })
    }

    #[instrument(skip(self), fields(operation = "all", backend = "sqlite"))]
    fn all(&self) -> Result<Vec<User>> {
        self.with_conn("all", |conn| {
            let mut stmt = conn
                .prepare(&format!("{SELECT_COLUMNS} ORDER BY id ASC"))
                .map_err(|e| Error::operation("prepare_all_users", e))?;
            stmt.query_map([], user_from_row)
                .map_err(|e| Error::operation("all_users", e))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| Error::operation("all_users", e))
        })
    }

    #[instrument(skip(self), fields(operation = "count", backend = "sqlite"))]
    fn count(&self) -> Result<usize> {
        self.with_conn("count", count_rows)
    }
}
