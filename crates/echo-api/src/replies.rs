use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::error;
use uuid::Uuid;

use echo_feed::engagement::entry_card;
use echo_types::api::CreateReplyRequest;
use echo_types::models::{Reply, Viewer};

use crate::auth::AppState;
use crate::http_status;

const MAX_REPLY: usize = 2000;

/// GET /entries/{id}/replies — oldest first. Replying and reading replies
/// both require the entry itself to be visible to the viewer.
pub async fn list_replies(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    entry_card(&state.store, entry_id, &viewer)
        .await
        .map_err(http_status)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || db.replies_for_entry(&entry_id.to_string()))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("DB replies_for_entry error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let replies: Vec<Reply> = rows.into_iter().map(|r| r.into_reply()).collect();
    Ok(Json(replies))
}

/// POST /entries/{id}/replies
pub async fn create_reply(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(entry_id): Path<Uuid>,
    Json(req): Json<CreateReplyRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let author_id = viewer.user_id().ok_or(StatusCode::UNAUTHORIZED)?;

    if req.body.trim().is_empty() || req.body.len() > MAX_REPLY {
        return Err(StatusCode::BAD_REQUEST);
    }

    entry_card(&state.store, entry_id, &viewer)
        .await
        .map_err(http_status)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let reply = Reply {
        id: Uuid::new_v4(),
        entry_id,
        author_id,
        body: req.body,
        created_at: Utc::now(),
    };

    let db = state.db.clone();
    let row = reply.clone();
    tokio::task::spawn_blocking(move || {
        db.insert_reply(
            &row.id.to_string(),
            &row.entry_id.to_string(),
            &row.author_id.to_string(),
            &row.body,
            &row.created_at.to_rfc3339(),
        )
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("DB insert_reply error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok((StatusCode::CREATED, Json(reply)))
}
