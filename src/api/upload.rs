use std::path::Path as FsPath;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use pms_core::models::{Ack, UploadReply, UploadedMedia};
use serde::Deserialize;

use super::{ApiError, ApiResult, ApiState};

pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
/// Request limit for the upload routes; leaves room for multipart framing.
pub(super) const BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 1024 * 1024;

const FIELD_NAME: &str = "media";

fn is_allowed_mime(mime: &str) -> bool {
    mime.starts_with("image/") || mime.starts_with("video/")
}

/// Extension from the original file name, else from the MIME subtype.
fn extension_for(original_name: &str, mime: &str) -> String {
    FsPath::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_else(|| {
            mime.split('/')
                .nth(1)
                .and_then(|sub| sub.split(['+', ';']).next())
                .unwrap_or("bin")
                .to_string()
        })
}

fn stored_name(extension: &str) -> String {
    format!(
        "{}-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4(),
        extension
    )
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::upload(StatusCode::PAYLOAD_TOO_LARGE, "File too large (max 50MB)")
    } else {
        ApiError::upload(StatusCode::BAD_REQUEST, err.body_text())
    }
}

pub async fn upload(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadReply>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FIELD_NAME) {
            continue;
        }
        let original_name = field.file_name().unwrap_or("upload").to_string();
        let mime = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        if !is_allowed_mime(&mime) {
            return Err(ApiError::upload(
                StatusCode::BAD_REQUEST,
                "Invalid file type. Only images and videos are allowed.",
            ));
        }
        let data = field.bytes().await.map_err(multipart_error)?;
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(ApiError::upload(
                StatusCode::PAYLOAD_TOO_LARGE,
                "File too large (max 50MB)",
            ));
        }

        let filename = stored_name(&extension_for(&original_name, &mime));
        tokio::fs::create_dir_all(&state.uploads_dir)
            .await
            .map_err(|e| ApiError::upload(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
        tokio::fs::write(state.uploads_dir.join(&filename), &data)
            .await
            .map_err(|e| ApiError::upload(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
        tracing::info!(%filename, size = data.len(), %mime, "Stored upload");

        return Ok(Json(UploadReply::stored(UploadedMedia {
            url: format!("/uploads/{filename}"),
            filename,
            original_name: Some(original_name),
            size: Some(data.len() as u64),
            mimetype: Some(mime),
        })));
    }
    Err(ApiError::upload(StatusCode::BAD_REQUEST, "No file uploaded"))
}

async fn remove(state: &ApiState, filename: &str) -> ApiResult<Json<Ack>> {
    let is_basename = FsPath::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        == Some(filename);
    if filename.is_empty() || !is_basename || filename.starts_with('.') {
        return Err(ApiError::BadRequest("Invalid filename".into()));
    }
    let path = state.uploads_dir.join(filename);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => {
            tracing::info!(%filename, "Deleted upload");
            Ok(Json(Ack::ok("File deleted successfully")))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::NotFound("File not found".into()))
        }
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FilenameQuery {
    pub filename: Option<String>,
}

pub async fn delete_by_path(
    State(state): State<ApiState>,
    Path(filename): Path<String>,
) -> ApiResult<Json<Ack>> {
    remove(&state, &filename).await
}

/// `DELETE /upload?filename=`.
pub async fn delete_by_query(
    State(state): State<ApiState>,
    Query(query): Query<FilenameQuery>,
) -> ApiResult<Json<Ack>> {
    let filename = query
        .filename
        .ok_or_else(|| ApiError::BadRequest("Filename required".into()))?;
    remove(&state, &filename).await
}
