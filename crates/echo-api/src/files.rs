use axum::{
    Extension,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tokio::io::AsyncWriteExt;
use tracing::error;
use uuid::Uuid;

use echo_types::api::UploadResponse;
use echo_types::models::Viewer;

use crate::auth::AppState;

/// 5 MB upload limit — entry images only.
const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

fn upload_dir() -> String {
    std::env::var("ECHO_UPLOAD_DIR").unwrap_or_else(|_| "./uploads".into())
}

fn public_base() -> String {
    std::env::var("ECHO_PUBLIC_URL").unwrap_or_else(|_| "http://localhost:3000".into())
}

/// POST /files — accepts raw image bytes, saves to the upload directory,
/// returns the public URL to put in an entry's `image_url`.
pub async fn upload_file(
    State(_state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    bytes: Bytes,
) -> Result<impl IntoResponse, StatusCode> {
    viewer.user_id().ok_or(StatusCode::UNAUTHORIZED)?;

    if bytes.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    if bytes.len() > MAX_FILE_SIZE {
        return Err(StatusCode::PAYLOAD_TOO_LARGE);
    }

    let file_id = Uuid::new_v4();
    let size = bytes.len() as u64;
    let dir = upload_dir();

    tokio::fs::create_dir_all(&dir).await.map_err(|e| {
        error!("Failed to create uploads directory {}: {}", dir, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let file_path = format!("{}/{}", dir, file_id);
    let mut file = tokio::fs::File::create(&file_path).await.map_err(|e| {
        error!("Failed to create file {}: {}", file_path, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    file.write_all(&bytes).await.map_err(|e| {
        error!("Failed to write file {}: {}", file_path, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok((
        StatusCode::CREATED,
        axum::Json(UploadResponse {
            url: format!("{}/files/{}", public_base(), file_id),
            size,
        }),
    ))
}

/// GET /files/{file_id} — serves an uploaded image. The UUID path segment
/// rules out traversal; anything else is a 400 from the extractor.
pub async fn download_file(
    State(_state): State<AppState>,
    Path(file_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let file_path = format!("{}/{}", upload_dir(), file_id);
    let bytes = tokio::fs::read(&file_path)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;

    Ok((
        [(axum::http::header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    ))
}
