//! Supporting document uploads.
//!
//! Bytes are written to the [`FileStore`] first and the metadata row second;
//! if the row cannot be written the stored object is removed again.

use crate::errors::ScError;
use crate::models::{extension_for_content_type, FileRow, UploadQuery};
use crate::observability::metrics;
use crate::repositories::{
    FilesRepository, NewFile, PeriodsRepository, StatusesRepository, StudentsRepository,
};
use crate::services::auth_service::AuthUser;
use crate::services::storage::{document_key, FileStore};
use crate::services::{period_service, student_service};
use common::types::Role;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

/// Upload one document for the caller in the current open period.
#[instrument(
    skip_all,
    name = "sc.files.upload",
    fields(user_id = %auth.user_id, kind = %query.kind, size = bytes.len())
)]
pub async fn upload_document(
    pool: &PgPool,
    store: &dyn FileStore,
    max_upload_bytes: usize,
    auth: &AuthUser,
    query: &UploadQuery,
    content_type: &str,
    bytes: &[u8],
) -> Result<FileRow, ScError> {
    auth.require_any(&[Role::Mahasiswa])?;
    query.validate().map_err(ScError::BadRequest)?;

    if bytes.is_empty() {
        metrics::record_file_upload("rejected", 0);
        return Err(ScError::BadRequest("File is empty".to_string()));
    }
    if bytes.len() > max_upload_bytes {
        metrics::record_file_upload("too_large", bytes.len());
        return Err(ScError::PayloadTooLarge(format!(
            "File exceeds the maximum size of {max_upload_bytes} bytes"
        )));
    }
    let extension = extension_for_content_type(content_type).ok_or_else(|| {
        metrics::record_file_upload("rejected", bytes.len());
        ScError::BadRequest("Only PDF, JPEG and PNG files are accepted".to_string())
    })?;

    let student = student_service::require_student(pool, auth.user_id).await?;
    let period = period_service::current_open_period(pool).await?;
    StatusesRepository::find(pool, student.student_id, period.period_id)
        .await?
        .ok_or_else(|| ScError::Forbidden("Not registered for the current period".to_string()))?;

    let file_id = Uuid::new_v4();
    let storage_key = document_key(period.period_id, student.student_id, file_id, extension);

    store.put(&storage_key, bytes).await.inspect_err(|_| {
        metrics::record_file_upload("error", bytes.len());
    })?;

    let size_bytes = i64::try_from(bytes.len())
        .map_err(|_| ScError::PayloadTooLarge("File is too large".to_string()))?;
    let new_file = NewFile {
        file_id,
        student_id: student.student_id,
        period_id: period.period_id,
        kind: query.kind.as_str(),
        original_name: query.filename.trim(),
        content_type,
        size_bytes,
        storage_key: &storage_key,
    };

    let file = match FilesRepository::create(pool, &new_file).await {
        Ok(file) => file,
        Err(e) => {
            if let Err(cleanup) = store.delete(&storage_key).await {
                tracing::warn!(
                    target: "sc.services.files",
                    storage_key = %storage_key,
                    error = %cleanup,
                    "Failed to remove orphaned upload"
                );
            }
            metrics::record_file_upload("error", bytes.len());
            return Err(e);
        }
    };

    metrics::record_file_upload("success", bytes.len());
    tracing::info!(
        target: "sc.services.files",
        file_id = %file.file_id,
        student_id = %student.student_id,
        "Document uploaded"
    );
    Ok(file)
}

/// Documents of the caller in the current period.
pub async fn list_my_documents(pool: &PgPool, auth: &AuthUser) -> Result<Vec<FileRow>, ScError> {
    auth.require_any(&[Role::Mahasiswa])?;
    let student = student_service::require_student(pool, auth.user_id).await?;
    let period = period_service::current_period(pool).await?;
    FilesRepository::list_for_student(pool, student.student_id, Some(period.period_id)).await
}

/// Delete one of the caller's documents while its period is open.
#[instrument(skip_all, name = "sc.files.delete", fields(file_id = %file_id))]
pub async fn delete_my_document(
    pool: &PgPool,
    store: &dyn FileStore,
    auth: &AuthUser,
    file_id: Uuid,
) -> Result<(), ScError> {
    auth.require_any(&[Role::Mahasiswa])?;
    let student = student_service::require_student(pool, auth.user_id).await?;

    let file = FilesRepository::find_by_id(pool, file_id)
        .await?
        .filter(|f| f.student_id == student.student_id)
        .ok_or_else(|| ScError::NotFound("File not found".to_string()))?;

    let period = PeriodsRepository::find_by_id(pool, file.period_id)
        .await?
        .ok_or_else(|| ScError::NotFound("Period not found".to_string()))?;
    if !period.is_open {
        return Err(ScError::BadRequest(
            "Documents can only be removed while the period is open".to_string(),
        ));
    }

    FilesRepository::delete(pool, file_id).await?;
    if let Err(e) = store.delete(&file.storage_key).await {
        tracing::warn!(
            target: "sc.services.files",
            storage_key = %file.storage_key,
            error = %e,
            "Failed to remove stored document"
        );
    }

    tracing::info!(target: "sc.services.files", file_id = %file_id, "Document deleted");
    Ok(())
}

/// Fetch a document's metadata and bytes for its owner or staff.
///
/// Other callers get 404 so document ids do not leak.
#[instrument(skip_all, name = "sc.files.download", fields(file_id = %file_id))]
pub async fn download_document(
    pool: &PgPool,
    store: &dyn FileStore,
    auth: &AuthUser,
    file_id: Uuid,
) -> Result<(FileRow, Vec<u8>), ScError> {
    let file = FilesRepository::find_by_id(pool, file_id)
        .await?
        .ok_or_else(|| ScError::NotFound("File not found".to_string()))?;

    if !auth.is_staff() {
        let owns = StudentsRepository::find_by_user(pool, auth.user_id)
            .await?
            .is_some_and(|student| student.student_id == file.student_id);
        if !owns {
            return Err(ScError::NotFound("File not found".to_string()));
        }
    }

    let bytes = store.get(&file.storage_key).await?;
    Ok((file, bytes))
}
