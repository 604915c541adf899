use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use echo_feed::moderation;
use echo_types::api::SubmitReportRequest;
use echo_types::models::Viewer;

use crate::auth::AppState;
use crate::http_status;

const MAX_REASON: usize = 500;

/// POST /entries/{id}/reports — flag an entry for moderation.
pub async fn submit_report(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(entry_id): Path<Uuid>,
    Json(req): Json<SubmitReportRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.reason.trim().is_empty() || req.reason.len() > MAX_REASON {
        return Err(StatusCode::BAD_REQUEST);
    }

    let report = moderation::submit_report(&state.store, &viewer, entry_id, req.reason)
        .await
        .map_err(http_status)?;

    Ok((StatusCode::CREATED, Json(report)))
}

/// GET /reports — the moderation queue, newest first, moderator only.
pub async fn list_reports(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, StatusCode> {
    let queue = moderation::list_reports(&state.store, &viewer)
        .await
        .map_err(http_status)?;

    Ok(Json(queue))
}

/// POST /reports/{id}/dismiss — close a report, entry untouched. A report
/// already in a terminal state is a 409.
pub async fn dismiss_report(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(report_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let report = moderation::dismiss_report(&state.store, &viewer, report_id)
        .await
        .map_err(http_status)?;

    Ok(Json(report))
}

/// POST /reports/{id}/resolve — uphold a report: the entry is deleted and
/// the report closed.
pub async fn resolve_report(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(report_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let report = moderation::resolve_report(&state.store, &viewer, report_id)
        .await
        .map_err(http_status)?;

    Ok(Json(report))
}
