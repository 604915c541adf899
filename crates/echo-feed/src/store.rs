//! Async seam between the engine and whatever row-store backs it.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::FeedError;
use crate::view::FeedFilter;
use echo_types::api::ReportDetail;
use echo_types::models::{Entry, ReactionKind, Report, ReportStatus, Viewer};

/// Aggregate engagement for one entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngagementCounts {
    pub reactions: i64,
    pub replies: i64,
}

/// Everything the engine needs from the row-store. Implementations enforce
/// row-level visibility on `fetch_page` themselves (a viewer never receives
/// rows they may not see) and hold the UNIQUE(entry, user) reaction
/// constraint that the optimistic controller treats as the source of truth.
#[async_trait]
pub trait Store: Send + Sync {
    /// One ordered window of entries visible to `viewer`, newest first with
    /// the entry id as tiebreaker.
    async fn fetch_page(
        &self,
        filter: &FeedFilter,
        viewer: &Viewer,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Entry>, FeedError>;

    async fn fetch_entry(&self, id: Uuid) -> Result<Option<Entry>, FeedError>;

    /// Reaction and reply counts for a whole page in one round trip.
    /// Entries without engagement may be absent from the map.
    async fn engagement_counts(
        &self,
        entry_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, EngagementCounts>, FeedError>;

    /// Of the given entries, the ones `user_id` has reacted to. One round
    /// trip per page regardless of page size.
    async fn reacted_by(
        &self,
        entry_ids: &[Uuid],
        user_id: Uuid,
    ) -> Result<HashSet<Uuid>, FeedError>;

    /// Of the given authors, the ones whose circle includes `viewer_id`.
    async fn circle_authors(
        &self,
        author_ids: &[Uuid],
        viewer_id: Uuid,
    ) -> Result<HashSet<Uuid>, FeedError>;

    /// Insert a reaction. `Conflict` when the (entry, user) pair already
    /// holds one, `NotFound` when the entry is gone.
    async fn insert_reaction(
        &self,
        entry_id: Uuid,
        user_id: Uuid,
        kind: ReactionKind,
    ) -> Result<(), FeedError>;

    /// Remove the viewer's reaction. Removing an absent reaction is Ok.
    async fn remove_reaction(&self, entry_id: Uuid, user_id: Uuid) -> Result<(), FeedError>;

    /// Delete an entry and its dependent reactions/replies. Returns false
    /// when the entry was already gone (not an error).
    async fn delete_entry(&self, entry_id: Uuid) -> Result<bool, FeedError>;

    async fn insert_report(&self, report: &Report) -> Result<(), FeedError>;

    async fn get_report(&self, id: Uuid) -> Result<Option<Report>, FeedError>;

    /// `pending` → terminal transition. Returns false when the report was
    /// not pending anymore (terminal states never transition).
    async fn transition_report(&self, id: Uuid, to: ReportStatus) -> Result<bool, FeedError>;

    /// Moderation queue, newest first, reported entries joined in where
    /// they still exist.
    async fn list_reports(&self) -> Result<Vec<ReportDetail>, FeedError>;
}
