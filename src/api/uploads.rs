use axum::{
    extract::{multipart::Field, Multipart, Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::validation::validate_upload;
use crate::core::state::AppState;

const ADMIN_UPLOAD_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "pdf"];
const ADMIN_UPLOAD_FOLDERS: &[&str] = &["thumbnails", "materials", "avatars"];

/// A file part read fully into memory.
#[derive(Debug)]
pub(crate) struct UploadedFile {
    pub(crate) filename: String,
    pub(crate) content_type: String,
    pub(crate) bytes: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct UploadQuery {
    #[serde(default)]
    folder: Option<String>,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    url: String,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(upload_file))
}

async fn upload_file(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let folder = query.folder.as_deref().unwrap_or("materials");
    if !ADMIN_UPLOAD_FOLDERS.contains(&folder) {
        return Err(ApiError::BadRequest(format!("Unknown upload folder '{folder}'")));
    }

    let storage = state
        .storage()
        .ok_or_else(|| ApiError::ServiceUnavailable("File storage is not configured".to_string()))?;

    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        if field.name() == Some("file") {
            file = Some(read_file_field(field, state.settings().storage().max_upload_size_mb).await?);
        }
    }

    let file = file.ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;
    validate_upload(&file.filename, &file.content_type, |ext| ADMIN_UPLOAD_EXTENSIONS.contains(&ext))?;

    let url = storage
        .upload(folder, &file.filename, &file.content_type, file.bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store file"))?;

    tracing::info!(admin_id = %admin.id, folder, url = %url, "File uploaded");
    Ok((StatusCode::CREATED, Json(UploadResponse { url })))
}

/// Reads a multipart file part, refusing anything above `max_upload_size_mb`.
pub(crate) async fn read_file_field(
    mut field: Field<'_>,
    max_upload_size_mb: u64,
) -> Result<UploadedFile, ApiError> {
    let filename = field.file_name().unwrap_or("upload").to_string();
    let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
    let max_bytes = max_upload_size_mb.saturating_mul(1024 * 1024);

    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
    {
        let next_size = bytes.len() as u64 + chunk.len() as u64;
        if next_size > max_bytes {
            return Err(ApiError::BadRequest(format!(
                "File size exceeds {max_upload_size_mb}MB limit"
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }

    Ok(UploadedFile { filename, content_type, bytes })
}
