//! HTTP error responses.

use crate::Error;
use crate::services::ValidationErrors;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// An error rendered as a JSON response.
///
/// Body: `{"message": ..., "errors": {field: [..]}}`, where `errors` is
/// present only for validation failures.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    errors: Option<ValidationErrors>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a ValidationErrors>,
}

impl ApiError {
    /// Creates an error with a status and message.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            errors: None,
        }
    }

    /// Creates a 500 error carrying a user-facing message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Creates a 400 error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Maps an error, replacing the message of server-side failures.
    ///
    /// Client errors (validation, not found, conflict, bad input) keep their
    /// own mapping; anything else becomes a 500 with `message(&err)`.
    pub fn or_internal(err: Error, message: impl FnOnce(&Error) -> String) -> Self {
        match err {
            Error::OperationFailed { .. } => {
                tracing::error!(error = %err, "Request failed");
                Self::internal(message(&err))
            },
            other => Self::from(other),
        }
    }

    /// Returns the status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(errors) => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message: errors
                    .first_message()
                    .unwrap_or("The given data was invalid.")
                    .to_string(),
                errors: Some(errors),
            },
            Error::NotFound(what) => Self::new(StatusCode::NOT_FOUND, format!("Not found: {what}")),
            Error::Conflict(what) => Self::new(StatusCode::CONFLICT, what),
            Error::InvalidInput(what) => Self::bad_request(what),
            err @ Error::OperationFailed { .. } => {
                tracing::error!(error = %err, "Request failed");
                Self::internal("Server error")
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: &self.message,
            errors: self.errors.as_ref(),
        };
        (self.status, Json(body)).into_response()
    }
}
