//! SQLite implementation of the engine's [`Store`] seam.
//!
//! Every call hops to `spawn_blocking` because rusqlite is synchronous and
//! the connection sits behind a mutex. Failures collapse into the engine's
//! taxonomy here: constraint violations become `Conflict`/`NotFound`,
//! everything else is `Transient`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::task;
use tracing::warn;
use uuid::Uuid;

use echo_db::queries::EntryQuery;
use echo_db::Database;
use echo_feed::store::{EngagementCounts, Store};
use echo_feed::view::FeedFilter;
use echo_feed::FeedError;
use echo_types::api::ReportDetail;
use echo_types::models::{Entry, ReactionKind, Report, ReportStatus, Viewer};

#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Database>,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, FeedError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        task::spawn_blocking(move || f(db.as_ref()))
            .await
            .map_err(|e| FeedError::Transient(format!("blocking task failed: {e}")))?
            .map_err(db_err)
    }
}

/// Constraint failures carry intent: a foreign-key miss means the target
/// row is gone, any other constraint is a conflicting write. The rest is
/// store unavailability.
fn db_err(e: anyhow::Error) -> FeedError {
    if let Some(rusqlite::Error::SqliteFailure(ffi, _)) = e.downcast_ref::<rusqlite::Error>() {
        if ffi.code == rusqlite::ErrorCode::ConstraintViolation {
            if ffi.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY {
                return FeedError::NotFound;
            }
            return FeedError::Conflict;
        }
    }
    FeedError::Transient(e.to_string())
}

fn parse_id(s: &str) -> Option<Uuid> {
    s.parse().map_or_else(
        |e| {
            warn!("Skipping unparseable id '{}': {}", s, e);
            None
        },
        Some,
    )
}

fn to_strings(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(|u| u.to_string()).collect()
}

#[async_trait]
impl Store for SqliteStore {
    async fn fetch_page(
        &self,
        filter: &FeedFilter,
        viewer: &Viewer,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Entry>, FeedError> {
        let filter = filter.clone();
        let viewer = *viewer;
        let rows = self
            .blocking(move |db| {
                let viewer_id = viewer.user_id().map(|u| u.to_string());
                let author = filter.author.map(|a| a.to_string());
                db.list_entries(&EntryQuery {
                    viewer: viewer_id.as_deref(),
                    scope: filter.scope.map(|s| s.as_str()),
                    author: author.as_deref(),
                    search: filter.search.as_deref(),
                    limit,
                    offset,
                })
            })
            .await?;
        Ok(rows.into_iter().map(|r| r.into_entry()).collect())
    }

    async fn fetch_entry(&self, id: Uuid) -> Result<Option<Entry>, FeedError> {
        let row = self
            .blocking(move |db| db.get_entry(&id.to_string()))
            .await?;
        Ok(row.map(|r| r.into_entry()))
    }

    async fn engagement_counts(
        &self,
        entry_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, EngagementCounts>, FeedError> {
        let ids = to_strings(entry_ids);
        let (reactions, replies) = self
            .blocking(move |db| Ok((db.reaction_counts(&ids)?, db.reply_counts(&ids)?)))
            .await?;

        let mut out: HashMap<Uuid, EngagementCounts> = HashMap::new();
        for (id, n) in reactions {
            if let Some(id) = parse_id(&id) {
                out.entry(id).or_default().reactions = n;
            }
        }
        for (id, n) in replies {
            if let Some(id) = parse_id(&id) {
                out.entry(id).or_default().replies = n;
            }
        }
        Ok(out)
    }

    async fn reacted_by(
        &self,
        entry_ids: &[Uuid],
        user_id: Uuid,
    ) -> Result<HashSet<Uuid>, FeedError> {
        let ids = to_strings(entry_ids);
        let rows = self
            .blocking(move |db| db.reacted_by(&ids, &user_id.to_string()))
            .await?;
        Ok(rows.iter().filter_map(|s| parse_id(s)).collect())
    }

    async fn circle_authors(
        &self,
        author_ids: &[Uuid],
        viewer_id: Uuid,
    ) -> Result<HashSet<Uuid>, FeedError> {
        let ids = to_strings(author_ids);
        let rows = self
            .blocking(move |db| db.circle_authors(&ids, &viewer_id.to_string()))
            .await?;
        Ok(rows.iter().filter_map(|s| parse_id(s)).collect())
    }

    async fn insert_reaction(
        &self,
        entry_id: Uuid,
        user_id: Uuid,
        kind: ReactionKind,
    ) -> Result<(), FeedError> {
        // OR IGNORE swallows the UNIQUE duplicate (insert count 0) but a
        // foreign-key miss on the entry still raises, mapping to NotFound.
        let inserted = self
            .blocking(move |db| {
                db.insert_reaction(
                    &Uuid::new_v4().to_string(),
                    &entry_id.to_string(),
                    &user_id.to_string(),
                    kind.as_str(),
                    &Utc::now().to_rfc3339(),
                )
            })
            .await?;
        if inserted {
            Ok(())
        } else {
            Err(FeedError::Conflict)
        }
    }

    async fn remove_reaction(&self, entry_id: Uuid, user_id: Uuid) -> Result<(), FeedError> {
        self.blocking(move |db| {
            db.remove_reaction(&entry_id.to_string(), &user_id.to_string())
        })
        .await?;
        Ok(())
    }

    async fn delete_entry(&self, entry_id: Uuid) -> Result<bool, FeedError> {
        self.blocking(move |db| db.delete_entry(&entry_id.to_string()))
            .await
    }

    async fn insert_report(&self, report: &Report) -> Result<(), FeedError> {
        let report = report.clone();
        self.blocking(move |db| {
            db.insert_report(
                &report.id.to_string(),
                &report.entry_id.to_string(),
                &report.reporter_id.to_string(),
                &report.reason,
                &report.created_at.to_rfc3339(),
            )
        })
        .await
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<Report>, FeedError> {
        let row = self
            .blocking(move |db| db.get_report(&id.to_string()))
            .await?;
        Ok(row.map(|r| r.into_report()))
    }

    async fn transition_report(&self, id: Uuid, to: ReportStatus) -> Result<bool, FeedError> {
        self.blocking(move |db| db.transition_report(&id.to_string(), to.as_str()))
            .await
    }

    async fn list_reports(&self) -> Result<Vec<ReportDetail>, FeedError> {
        self.blocking(move |db| {
            let rows = db.list_reports()?;

            let reporter_ids: Vec<String> = rows
                .iter()
                .map(|r| r.reporter_id.clone())
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            let usernames: HashMap<String, String> =
                db.usernames_for_ids(&reporter_ids)?.into_iter().collect();

            rows.into_iter()
                .map(|row| {
                    let entry = db.get_entry(&row.entry_id)?.map(|e| e.into_entry());
                    let reporter_username = usernames.get(&row.reporter_id).cloned();
                    Ok(ReportDetail {
                        report: row.into_report(),
                        reporter_username,
                        entry,
                    })
                })
                .collect()
        })
        .await
    }
}
