//! User store trait.

use crate::Result;
use crate::models::{NewUser, Page, PageRequest, User, UserChanges, UserId};

/// Trait for user record storage.
///
/// The store is the authority on email uniqueness: `insert` and `update`
/// return [`crate::Error::Conflict`] when another record already owns the
/// email, even if the caller checked beforehand.
pub trait UserStore: Send + Sync {
    /// Inserts a user, assigning its id and timestamps.
    fn insert(&self, user: &NewUser) -> Result<User>;

    /// Retrieves a user by ID.
    fn get(&self, id: UserId) -> Result<Option<User>>;

    /// Retrieves a user by exact email address.
    fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Returns whether any user other than `except` owns `email`.
    fn email_exists(&self, email: &str, except: Option<UserId>) -> Result<bool>;

    /// Applies changes to an existing user and bumps `updated_at`.
    ///
    /// Returns `None` when the user does not exist.
    fn update(&self, id: UserId, changes: &UserChanges) -> Result<Option<User>>;

    /// Deletes a user. Returns `true` when a record was removed.
    fn delete(&self, id: UserId) -> Result<bool>;

    /// Returns one page of users ordered by id.
    fn list(&self, request: PageRequest) -> Result<Page<User>>;

    /// Returns every user ordered by id.
    fn all(&self) -> Result<Vec<User>>;

    /// Returns the total number of users.
    fn count(&self) -> Result<usize>;

    /// Checks if a user exists.
    fn exists(&self, id: UserId) -> Result<bool> {
        Ok(self.get(id)?.is_some())
    }
}
