//! Document upload and download handlers.
//!
//! - `POST /api/v1/students/me/files?kind=&filename=` - Upload (raw body)
//! - `GET /api/v1/students/me/files` - Own documents in the current period
//! - `DELETE /api/v1/students/me/files/:file_id` - Remove own document
//! - `GET /api/v1/students/:student_id/files` - An applicant's documents (staff)
//! - `GET /api/v1/files/:file_id/content` - Download (owner or staff)
//!
//! Uploads carry the file as the request body with its media type in
//! `Content-Type`; `kind` and `filename` travel in the query string.

use crate::errors::ScError;
use crate::handlers::extract::{Bytes, Path, Query};
use crate::models::{FileRow, UploadQuery};
use crate::repositories::{FilesRepository, StudentsRepository};
use crate::routes::AppState;
use crate::services::auth_service::AuthUser;
use crate::services::file_service;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use common::types::STAFF_ROLES;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Media type without parameters, lowercased.
fn media_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

/// `Content-Disposition` value with the stored name made header-safe.
fn attachment_disposition(original_name: &str) -> String {
    let safe: String = original_name
        .chars()
        .map(|c| {
            if c == '"' || c == '\\' || c.is_control() || !c.is_ascii() {
                '_'
            } else {
                c
            }
        })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

/// Handler for POST /api/v1/students/me/files
///
/// # Response
///
/// - 201 Created: Document metadata
/// - 400 Bad Request: Empty body, unsupported content type, bad query, or closed period
/// - 403 Forbidden: Not a student, or not registered for the current period
/// - 413 Payload Too Large: Body exceeds `MAX_UPLOAD_BYTES`
#[instrument(skip_all, name = "sc.files.upload_handler")]
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<FileRow>), ScError> {
    let content_type = media_type(&headers);
    let file = file_service::upload_document(
        &state.pool,
        state.file_store.as_ref(),
        state.config.max_upload_bytes,
        &auth,
        &query,
        &content_type,
        &body,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(file)))
}

/// Handler for GET /api/v1/students/me/files
#[instrument(skip_all, name = "sc.files.list_mine")]
pub async fn list_my_documents(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<FileRow>>, ScError> {
    Ok(Json(file_service::list_my_documents(&state.pool, &auth).await?))
}

/// Handler for DELETE /api/v1/students/me/files/:file_id
///
/// # Response
///
/// - 204 No Content: Metadata and stored object removed
/// - 400 Bad Request: The document's period is closed
/// - 404 Not Found: No such document owned by the caller
#[instrument(skip_all, name = "sc.files.delete_mine", fields(file_id = %file_id))]
pub async fn delete_my_document(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(file_id): Path<Uuid>,
) -> Result<StatusCode, ScError> {
    file_service::delete_my_document(&state.pool, state.file_store.as_ref(), &auth, file_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/v1/students/:student_id/files
#[instrument(skip_all, name = "sc.files.list_for_student", fields(student_id = %student_id))]
pub async fn list_student_documents(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(student_id): Path<Uuid>,
) -> Result<Json<Vec<FileRow>>, ScError> {
    auth.require_any(STAFF_ROLES)?;

    StudentsRepository::find_by_id(&state.pool, student_id)
        .await?
        .ok_or_else(|| ScError::NotFound("Student not found".to_string()))?;

    Ok(Json(
        FilesRepository::list_for_student(&state.pool, student_id, None).await?,
    ))
}

/// Handler for GET /api/v1/files/:file_id/content
///
/// # Response
///
/// - 200 OK: File bytes with `Content-Type` and `Content-Disposition`
/// - 404 Not Found: Unknown document, or caller is neither owner nor staff
#[instrument(skip_all, name = "sc.files.download_handler", fields(file_id = %file_id))]
pub async fn download_document(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(file_id): Path<Uuid>,
) -> Result<impl IntoResponse, ScError> {
    let (file, bytes) =
        file_service::download_document(&state.pool, state.file_store.as_ref(), &auth, file_id)
            .await?;

    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.clone()),
            (
                header::CONTENT_DISPOSITION,
                attachment_disposition(&file.original_name),
            ),
        ],
        bytes,
    ))
}
