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
use echo_feed::moderation;
use echo_types::api::CreateEntryRequest;
use echo_types::models::{Entry, Viewer};

use crate::auth::AppState;
use crate::http_status;

const MAX_HEADLINE: usize = 140;
const MAX_REFLECTION: usize = 5000;
const MAX_TAGS: usize = 8;

/// POST /entries — publish a mood entry at the requested scope.
pub async fn create_entry(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<CreateEntryRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let author_id = viewer.user_id().ok_or(StatusCode::UNAUTHORIZED)?;

    if req.headline.trim().is_empty() || req.headline.len() > MAX_HEADLINE {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.reflection.len() > MAX_REFLECTION || req.tags.len() > MAX_TAGS {
        return Err(StatusCode::BAD_REQUEST);
    }

    let entry = Entry {
        id: Uuid::new_v4(),
        author_id,
        headline: req.headline,
        reflection: req.reflection,
        scope: req.scope,
        tags: req.tags,
        mood_tone: req.mood_tone,
        image_url: req.image_url,
        is_anonymous: req.is_anonymous,
        created_at: Utc::now(),
    };

    let tags_json = serde_json::to_string(&entry.tags).map_err(|e| {
        error!("Failed to encode tags: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let db = state.db.clone();
    let row = entry.clone();
    tokio::task::spawn_blocking(move || {
        db.insert_entry(
            &row.id.to_string(),
            &row.author_id.to_string(),
            &row.headline,
            &row.reflection,
            row.scope.as_str(),
            &tags_json,
            &row.mood_tone,
            row.image_url.as_deref(),
            row.is_anonymous,
            &row.created_at.to_rfc3339(),
        )
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("DB insert_entry error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /entries/{id} — a single entry as the viewer sees it, with counts.
/// Not-visible and nonexistent are both 404.
pub async fn get_entry(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let card = entry_card(&state.store, entry_id, &viewer)
        .await
        .map_err(http_status)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(card))
}

/// DELETE /entries/{id} — author or moderator only. Deleting an entry that
/// is already gone still returns 204.
pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    moderation::delete_entry(&state.store, &viewer, entry_id)
        .await
        .map_err(http_status)?;

    Ok(StatusCode::NO_CONTENT)
}
