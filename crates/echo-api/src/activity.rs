use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;

use echo_types::api::ActivityItem;
use echo_types::models::Viewer;

use crate::auth::AppState;

const ACTIVITY_LIMIT: u32 = 20;

/// GET /activity — reactions other users left on the viewer's entries,
/// newest first, capped at the most recent twenty.
pub async fn get_activity(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, StatusCode> {
    let user_id = viewer.user_id().ok_or(StatusCode::UNAUTHORIZED)?;

    let db = state.db.clone();
    let rows =
        tokio::task::spawn_blocking(move || db.recent_activity(&user_id.to_string(), ACTIVITY_LIMIT))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .map_err(|e| {
                error!("DB recent_activity error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;

    let items: Vec<ActivityItem> = rows.into_iter().map(|r| r.into_item()).collect();
    Ok(Json(items))
}
