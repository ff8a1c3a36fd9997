//! Route handlers.
//!
//! Store and file work is synchronous and runs on the blocking pool.

use super::AppState;
use super::error::ApiError;
use crate::io::services::{export, import};
use crate::io::{ImportReport, UPLOAD_FIELD, UploadedFile};
use crate::models::{Page, User, UserId};
use crate::services::{DELETE_FAILED_MESSAGE, RegisterRequest, UpdateUserRequest};
use crate::{Error, Result};
use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Query string for the user listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// 1-based page number.
    pub page: Option<usize>,
}

#[derive(Serialize)]
struct UserBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    user: User,
}

/// Response body of a finished import.
#[derive(Serialize)]
pub struct ImportBody {
    message: String,
    #[serde(flatten)]
    report: ImportReport,
}

/// Runs synchronous work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::operation("spawn_blocking", e))?
}

/// `GET /health`
pub async fn health(
    State(state): State<AppState>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let users = state.users.clone();
    let count = blocking(move || users.store().count()).await?;
    Ok(Json(json!({ "status": "ok", "users": count })))
}

/// `POST /register`
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> std::result::Result<Response, ApiError> {
    let users = state.users.clone();
    let outcome = blocking(move || users.register(&request)).await?;
    let body = UserBody {
        message: Some(outcome.message),
        user: outcome.data,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// `GET /users?page=N`
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> std::result::Result<Json<Page<User>>, ApiError> {
    let users = state.users.clone();
    let page = query.page.unwrap_or(1);
    Ok(Json(blocking(move || users.list(page)).await?))
}

/// `GET /users/{id}/edit` and `GET /users/{id}/delete`
pub async fn show_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> std::result::Result<Response, ApiError> {
    let users = state.users.clone();
    let user = blocking(move || users.get(UserId::new(id))).await?;
    Ok(Json(UserBody {
        message: None,
        user,
    })
    .into_response())
}

/// `PUT /users/{id}`
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> std::result::Result<Response, ApiError> {
    let users = state.users.clone();
    let outcome = blocking(move || users.update(UserId::new(id), &request)).await?;
    Ok(Json(UserBody {
        message: Some(outcome.message),
        user: outcome.data,
    })
    .into_response())
}

/// `DELETE /users/{id}`
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let users = state.users.clone();
    let outcome = blocking(move || users.delete(UserId::new(id)))
        .await
        .map_err(|e| ApiError::or_internal(e, |_| DELETE_FAILED_MESSAGE.to_string()))?;
    Ok(Json(json!({ "message": outcome.message, "id": outcome.data })))
}

/// `POST /users/import` (multipart, field `csv_file`)
pub async fn import_users(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> std::result::Result<Json<ImportBody>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().map(ToString::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Malformed upload: {e}")))?;
        upload = Some(UploadedFile {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    let imports = state.imports.clone();
    let report = blocking(move || imports.import_upload(upload.as_ref()))
        .await
        .map_err(|e| match e {
            Error::Validation(_) => ApiError::from(e),
            Error::InvalidInput(_) => ApiError::bad_request(import::failure_message(&e)),
            other => {
                tracing::error!(error = %other, "User import failed");
                ApiError::internal(import::failure_message(&other))
            },
        })?;

    Ok(Json(ImportBody {
        message: report.summary(),
        report,
    }))
}

/// `GET /users/export`
///
/// Writes a new export file and streams it back as an attachment. The file
/// stays in the exports directory.
pub async fn export_users(
    State(state): State<AppState>,
) -> std::result::Result<Response, ApiError> {
    let exports = state.exports.clone();
    let result = blocking(move || exports.export()).await.map_err(|e| {
        tracing::error!(error = %e, "User export failed");
        ApiError::internal(export::failure_message(&e))
    })?;

    let bytes = tokio::fs::read(&result.path).await.map_err(|e| {
        let err = Error::operation("read_export_file", e);
        tracing::error!(error = %err, "User export failed");
        ApiError::internal(export::failure_message(&err))
    })?;

    let disposition = format!("attachment; filename=\"{}\"", result.filename);
    Ok((
        [
            (header::CONTENT_TYPE, result.format.mime_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// `GET /users/exports`
pub async fn list_exports(
    State(state): State<AppState>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let exports = state.exports.clone();
    let files = blocking(move || exports.list_exports()).await?;
    Ok(Json(json!({ "exports": files })))
}
