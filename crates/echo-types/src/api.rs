use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Entry, ReactionKind, Report, Scope};

// -- JWT Claims --

/// JWT claims shared between echo-api middleware and token issuance.
/// Canonical definition lives here in echo-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    #[serde(default)]
    pub moderator: bool,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub moderator: bool,
    pub token: String,
}

// -- Entries --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEntryRequest {
    pub headline: String,
    pub reflection: String,
    pub scope: Scope,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_mood_tone")]
    pub mood_tone: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

fn default_mood_tone() -> String {
    "neutral".to_string()
}

// -- Reactions --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleReactionRequest {
    #[serde(default)]
    pub kind: ReactionKind,
}

#[derive(Debug, Serialize)]
pub struct ToggleReactionResponse {
    pub reacted: bool,
    pub reaction_count: i64,
}

// -- Replies --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReplyRequest {
    pub body: String,
}

// -- Reports --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitReportRequest {
    pub reason: String,
}

/// A report as shown in the moderation queue: the reported entry is joined
/// in when it still exists. `entry: None` marks an orphaned report whose
/// target was deleted by another path; it is informational only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDetail {
    #[serde(flatten)]
    pub report: Report,
    pub reporter_username: Option<String>,
    pub entry: Option<Entry>,
}

// -- Activity --

/// One row of the viewer's activity feed: someone else reacted to one of
/// their entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityItem {
    pub reaction_id: Uuid,
    pub kind: ReactionKind,
    pub reactor_id: Uuid,
    pub reactor_username: String,
    pub entry_id: Uuid,
    pub headline: String,
    pub created_at: DateTime<Utc>,
}

// -- Files --

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub size: u64,
}
