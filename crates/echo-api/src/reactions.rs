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
use echo_types::api::{ToggleReactionRequest, ToggleReactionResponse};
use echo_types::models::Viewer;

use crate::auth::AppState;
use crate::http_status;

/// POST /entries/{id}/reactions — flip the viewer's reaction on an entry.
/// The UNIQUE(entry, user) constraint settles races: whichever write lands
/// second becomes the removal, and the response reports the final state.
pub async fn toggle_reaction(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(entry_id): Path<Uuid>,
    Json(req): Json<ToggleReactionRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let user_id = viewer.user_id().ok_or(StatusCode::UNAUTHORIZED)?;

    // Reacting requires the entry to be visible, not just to exist.
    entry_card(&state.store, entry_id, &viewer)
        .await
        .map_err(http_status)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let db = state.db.clone();
    let (reacted, reaction_count) = tokio::task::spawn_blocking(move || {
        db.toggle_reaction(
            &Uuid::new_v4().to_string(),
            &entry_id.to_string(),
            &user_id.to_string(),
            req.kind.as_str(),
            &Utc::now().to_rfc3339(),
        )
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("DB toggle_reaction error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(ToggleReactionResponse {
        reacted,
        reaction_count,
    }))
}
