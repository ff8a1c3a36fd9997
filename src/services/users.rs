//! User management service.
//!
//! Backs the list, edit, update, delete and registration actions. Every write
//! is validated first; the store's uniqueness check is the final authority and
//! a late conflict is reported as the same validation message.

use super::password::PasswordHasher;
use super::validation::{
    EMAIL_TAKEN, ValidationErrors, check_email, check_password, check_required_max,
};
use crate::models::{NewUser, Page, PageRequest, User, UserChanges, UserId};
use crate::storage::UserStore;
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// Default number of users per page.
pub const DEFAULT_PER_PAGE: usize = 10;

/// Message returned after a successful update.
pub const UPDATED_MESSAGE: &str = "User updated successfully!";

/// Message returned after a successful registration.
pub const REGISTERED_MESSAGE: &str = "Registration successful!";

/// Message returned when a delete fails for a reason other than a missing user.
pub const DELETE_FAILED_MESSAGE: &str = "Failed to delete user. Please try again.";

/// Update form input.
///
/// The password is optional; when absent or blank the stored hash is kept.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    /// New name.
    #[serde(default)]
    pub name: String,
    /// New email.
    #[serde(default)]
    pub email: String,
    /// New password.
    #[serde(default)]
    pub password: Option<SecretString>,
    /// Confirmation of the new password.
    #[serde(default)]
    pub password_confirmation: Option<SecretString>,
}

/// Registration form input.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Email.
    #[serde(default)]
    pub email: String,
    /// Password.
    #[serde(default)]
    pub password: Option<SecretString>,
    /// Confirmation of the password.
    #[serde(default)]
    pub password_confirmation: Option<SecretString>,
}

/// A completed action with its user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome<T> {
    /// Flash-style message describing what happened.
    pub message: String,
    /// The affected record.
    pub data: T,
}

impl<T> Outcome<T> {
    fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

/// Service for listing and editing users.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    per_page: usize,
}

impl UserService {
    /// Creates a new user service.
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        Self {
            store,
            hasher,
            per_page: DEFAULT_PER_PAGE,
        }
    }

    /// Sets the page size used by [`Self::list`].
    #[must_use]
    pub fn with_per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    /// Returns one page of users. Pages below 1 are treated as page 1.
    #[instrument(skip(self))]
    pub fn list(&self, page: usize) -> Result<Page<User>> {
        self.store.list(PageRequest::new(page, self.per_page))
    }

    /// Returns a user or [`Error::NotFound`].
    #[instrument(skip(self), fields(user.id = %id))]
    pub fn get(&self, id: UserId) -> Result<User> {
        self.store
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("user {id}")))
    }

    /// Validates and applies an update.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the user does not exist
    /// - [`Error::Validation`] if any field fails its rules
    #[instrument(skip(self, request), fields(user.id = %id))]
    pub fn update(&self, id: UserId, request: &UpdateUserRequest) -> Result<Outcome<User>> {
        // Resolve the user before validating so a stale id is a 404, not a 422.
        self.get(id)?;

        let password = filled(request.password.as_ref());
        let mut errors = self.validate_profile(&request.name, &request.email, Some(id))?;
        if let Some(password) = password {
            let confirmation = request
                .password_confirmation
                .as_ref()
                .map(ExposeSecret::expose_secret);
            if let Some(message) = check_password(password.expose_secret(), confirmation) {
                errors.add("password", message);
            }
        }
        errors.into_result()?;

        let changes = UserChanges {
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            password_hash: password.map(|p| self.hasher.hash(p)).transpose()?,
        };

        let user = self
            .store
            .update(id, &changes)
            .map_err(conflict_as_validation)?
            .ok_or_else(|| Error::NotFound(format!("user {id}")))?;

        tracing::info!(user.id = %id, password_changed = changes.password_hash.is_some(), "User updated");
        Ok(Outcome::new(UPDATED_MESSAGE, user))
    }

    /// Deletes a user.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the user does not exist
    /// - [`Error::OperationFailed`] carrying [`DELETE_FAILED_MESSAGE`] if the
    ///   store fails; the underlying cause is logged
    #[instrument(skip(self), fields(user.id = %id))]
    pub fn delete(&self, id: UserId) -> Result<Outcome<UserId>> {
        let user = self.get(id)?;

        match self.store.delete(id) {
            Ok(true) => {
                tracing::info!(user.id = %id, "User deleted");
                Ok(Outcome::new(
                    format!("User '{}' deleted successfully!", user.name),
                    id,
                ))
            },
            Ok(false) => Err(Error::NotFound(format!("user {id}"))),
            Err(e) => {
                tracing::error!(user.id = %id, error = %e, "Failed to delete user");
                Err(Error::operation("delete_user", DELETE_FAILED_MESSAGE))
            },
        }
    }

    /// Validates and creates a new user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if any field fails its rules.
    #[instrument(skip(self, request))]
    pub fn register(&self, request: &RegisterRequest) -> Result<Outcome<User>> {
        let mut errors = self.validate_profile(&request.name, &request.email, None)?;
        let password = request
            .password
            .as_ref()
            .map_or("", ExposeSecret::expose_secret);
        let confirmation = request
            .password_confirmation
            .as_ref()
            .map(ExposeSecret::expose_secret);
        if let Some(message) = check_password(password, confirmation) {
            errors.add("password", message);
        }
        errors.into_result()?;

        let password_hash = self.hasher.hash(&SecretString::from(password))?;
        let user = self
            .store
            .insert(&NewUser::new(
                request.name.trim(),
                request.email.trim(),
                password_hash,
            ))
            .map_err(conflict_as_validation)?;

        tracing::info!(user.id = %user.id, "User registered");
        Ok(Outcome::new(REGISTERED_MESSAGE, user))
    }

    /// Runs the name and email rules, including uniqueness.
    fn validate_profile(
        &self,
        name: &str,
        email: &str,
        except: Option<UserId>,
    ) -> Result<ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(message) = check_required_max("name", name) {
            errors.add("name", message);
        }
        if let Some(message) = check_email(email) {
            errors.add("email", message);
        } else if self.store.email_exists(email.trim(), except)? {
            errors.add("email", EMAIL_TAKEN);
        }
        Ok(errors)
    }
}

/// Returns the password when it holds more than whitespace.
fn filled(password: Option<&SecretString>) -> Option<&SecretString> {
    password.filter(|p| !p.expose_secret().trim().is_empty())
}

fn conflict_as_validation(err: Error) -> Error {
    match err {
        Error::Conflict(_) => Error::Validation(ValidationErrors::single("email", EMAIL_TAKEN)),
        other => other,
    }
}
