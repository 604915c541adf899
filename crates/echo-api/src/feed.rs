use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use echo_feed::view::{self, FeedFilter, PAGE_SIZE};
use echo_types::models::{Scope, Viewer};

use crate::auth::AppState;
use crate::http_status;

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub scope: Option<String>,
    pub page: Option<u32>,
    /// Substring search over headline and reflection.
    pub q: Option<String>,
    pub author: Option<Uuid>,
}

/// GET /feed — one visibility-filtered, engagement-enriched page. Serves
/// both signed-in and anonymous viewers; the page index is zero-based.
pub async fn get_feed(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Query(params): Query<FeedParams>,
) -> Result<impl IntoResponse, StatusCode> {
    let scope = match params.scope.as_deref() {
        None => None,
        Some(s) => Some(Scope::parse(s).ok_or(StatusCode::BAD_REQUEST)?),
    };

    let filter = FeedFilter {
        scope,
        author: params.author,
        search: params.q.filter(|q| !q.is_empty()),
    };

    let page = view::fetch_page(&state.store, &filter, &viewer, params.page.unwrap_or(0))
        .await
        .map_err(http_status)?;

    Ok(Json(serde_json::json!({
        "items": page.items,
        "has_more": page.has_more,
        "page_size": PAGE_SIZE,
    })))
}
