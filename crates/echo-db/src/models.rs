//! Database row types — these map directly to SQLite rows.
//! Distinct from the echo-types API models to keep the DB layer independent;
//! `into_*` conversions absorb corrupt rows with a warning instead of
//! failing the whole page.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use echo_types::api::ActivityItem;
use echo_types::models::{Entry, ReactionKind, Reply, Report, ReportStatus, Scope};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub is_moderator: bool,
    pub created_at: String,
}

pub struct EntryRow {
    pub id: String,
    pub author_id: String,
    pub headline: String,
    pub reflection: String,
    pub scope: String,
    pub tags: String,
    pub mood_tone: String,
    pub image_url: Option<String>,
    pub is_anonymous: bool,
    pub created_at: String,
}

pub struct ReplyRow {
    pub id: String,
    pub entry_id: String,
    pub author_id: String,
    pub body: String,
    pub created_at: String,
}

/// A reaction joined with its entry's headline and the reactor's username,
/// as listed on the activity page.
pub struct ActivityRow {
    pub reaction_id: String,
    pub kind: String,
    pub reactor_id: String,
    pub reactor_username: String,
    pub entry_id: String,
    pub headline: String,
    pub created_at: String,
}

pub struct ReportRow {
    pub id: String,
    pub entry_id: String,
    pub reporter_id: String,
    pub reason: String,
    pub status: String,
    pub created_at: String,
}

fn parse_uuid(s: &str, field: &str, row: &str) -> Uuid {
    s.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on row '{}': {}", field, s, row, e);
        Uuid::default()
    })
}

fn parse_timestamp(s: &str, row: &str) -> DateTime<Utc> {
    s.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite-generated timestamps are "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on row '{}': {}", s, row, e);
            DateTime::default()
        })
}

impl EntryRow {
    pub fn into_entry(self) -> Entry {
        let tags: Vec<String> = serde_json::from_str(&self.tags).unwrap_or_else(|e| {
            warn!("Corrupt tags '{}' on entry '{}': {}", self.tags, self.id, e);
            Vec::new()
        });

        Entry {
            author_id: parse_uuid(&self.author_id, "author_id", &self.id),
            headline: self.headline,
            reflection: self.reflection,
            scope: Scope::from_db(&self.scope, &self.id),
            tags,
            mood_tone: self.mood_tone,
            image_url: self.image_url,
            is_anonymous: self.is_anonymous,
            created_at: parse_timestamp(&self.created_at, &self.id),
            id: parse_uuid(&self.id, "id", &self.id),
        }
    }
}

impl ReplyRow {
    pub fn into_reply(self) -> Reply {
        Reply {
            entry_id: parse_uuid(&self.entry_id, "entry_id", &self.id),
            author_id: parse_uuid(&self.author_id, "author_id", &self.id),
            body: self.body,
            created_at: parse_timestamp(&self.created_at, &self.id),
            id: parse_uuid(&self.id, "id", &self.id),
        }
    }
}

impl ActivityRow {
    pub fn into_item(self) -> ActivityItem {
        let kind = ReactionKind::parse(&self.kind).unwrap_or_else(|| {
            warn!("Corrupt kind '{}' on reaction '{}', treating as like", self.kind, self.reaction_id);
            ReactionKind::default()
        });

        ActivityItem {
            kind,
            reactor_id: parse_uuid(&self.reactor_id, "reactor_id", &self.reaction_id),
            reactor_username: self.reactor_username,
            entry_id: parse_uuid(&self.entry_id, "entry_id", &self.reaction_id),
            headline: self.headline,
            created_at: parse_timestamp(&self.created_at, &self.reaction_id),
            reaction_id: parse_uuid(&self.reaction_id, "id", &self.reaction_id),
        }
    }
}

impl ReportRow {
    pub fn into_report(self) -> Report {
        let status = ReportStatus::parse(&self.status).unwrap_or_else(|| {
            warn!("Corrupt status '{}' on report '{}', treating as pending", self.status, self.id);
            ReportStatus::Pending
        });

        Report {
            entry_id: parse_uuid(&self.entry_id, "entry_id", &self.id),
            reporter_id: parse_uuid(&self.reporter_id, "reporter_id", &self.id),
            reason: self.reason,
            status,
            created_at: parse_timestamp(&self.created_at, &self.id),
            id: parse_uuid(&self.id, "id", &self.id),
        }
    }
}
