//! Circle membership management. An author's circle is the set of users
//! they have added; circle-scoped entries are visible to exactly that set
//! (plus the author).

use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use echo_types::models::Viewer;

use crate::auth::AppState;

/// POST /circle/{user_id} — add a user to the caller's circle. Idempotent.
pub async fn add_to_circle(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(member_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let author_id = viewer.user_id().ok_or(StatusCode::UNAUTHORIZED)?;
    if member_id == author_id {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();
    let exists = tokio::task::spawn_blocking(move || db.get_user_by_id(&member_id.to_string()))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("DB get_user_by_id error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .is_some();
    if !exists {
        return Err(StatusCode::NOT_FOUND);
    }

    let db = state.db.clone();
    tokio::task::spawn_blocking(move || {
        db.add_follow(&author_id.to_string(), &member_id.to_string())
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("DB add_follow error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /circle/{user_id} — remove a user from the caller's circle.
/// Removing someone who was never a member is a no-op.
pub async fn remove_from_circle(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(member_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let author_id = viewer.user_id().ok_or(StatusCode::UNAUTHORIZED)?;

    let db = state.db.clone();
    tokio::task::spawn_blocking(move || {
        db.remove_follow(&author_id.to_string(), &member_id.to_string())
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("DB remove_follow error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(StatusCode::NO_CONTENT)
}
