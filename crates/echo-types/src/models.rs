use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Visibility tier of a mood entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Public,
    Community,
    Circle,
    Private,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Public => "public",
            Scope::Community => "community",
            Scope::Circle => "circle",
            Scope::Private => "private",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Scope::Public),
            "community" => Some(Scope::Community),
            "circle" => Some(Scope::Circle),
            "private" => Some(Scope::Private),
            _ => None,
        }
    }

    /// Decode a scope coming out of the store. An unrecognized value is a
    /// data-integrity problem; it decodes as `private` so the entry is never
    /// shown more widely than intended.
    pub fn from_db(s: &str, entry_id: &str) -> Self {
        Scope::parse(s).unwrap_or_else(|| {
            warn!("Unrecognized scope '{}' on entry '{}', treating as private", s, entry_id);
            Scope::Private
        })
    }
}

/// Kind of reaction a viewer can leave on an entry. At most one reaction
/// per (entry, viewer) regardless of kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Hug,
    Support,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Hug => "hug",
            ReactionKind::Support => "support",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "like" => Some(ReactionKind::Like),
            "hug" => Some(ReactionKind::Hug),
            "support" => Some(ReactionKind::Support),
            _ => None,
        }
    }
}

impl Default for ReactionKind {
    fn default() -> Self {
        ReactionKind::Like
    }
}

/// Lifecycle state of a report. `Resolved` and `Dismissed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReportStatus::Pending),
            "resolved" => Some(ReportStatus::Resolved),
            "dismissed" => Some(ReportStatus::Dismissed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReportStatus::Pending)
    }
}

/// A posted mood entry. Immutable once created except via full delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub author_id: Uuid,
    pub headline: String,
    pub reflection: String,
    pub scope: Scope,
    pub tags: Vec<String>,
    pub mood_tone: String,
    pub image_url: Option<String>,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub reporter_id: Uuid,
    pub reason: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

/// Identity of an authenticated user, as the engine sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserContext {
    pub id: Uuid,
    pub moderator: bool,
}

/// The identity a feed or mutation is evaluated against. Anonymous viewers
/// can read public entries but cannot react, reply, or report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    User(UserContext),
}

impl Viewer {
    pub fn user(id: Uuid) -> Self {
        Viewer::User(UserContext { id, moderator: false })
    }

    pub fn moderator(id: Uuid) -> Self {
        Viewer::User(UserContext { id, moderator: true })
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(ctx) => Some(ctx.id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Viewer::User(_))
    }

    pub fn is_moderator(&self) -> bool {
        matches!(self, Viewer::User(ctx) if ctx.moderator)
    }
}
