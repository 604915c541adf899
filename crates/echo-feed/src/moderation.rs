//! Report lifecycle and the administrative actions it unlocks.
//!
//! States: `pending → resolved` (entry deleted) or `pending → dismissed`
//! (no content change). Terminal states never transition again — the store
//! guard enforces that even under racing moderators. Authorization is
//! resolved here, once, so every call site gets the same contract.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::FeedError;
use crate::store::Store;
use echo_types::api::ReportDetail;
use echo_types::models::{Report, ReportStatus, Viewer};

/// Anonymous callers get `Unauthenticated`, signed-in non-moderators get
/// `Forbidden`; both leave the world untouched.
fn require_moderator(viewer: &Viewer) -> Result<Uuid, FeedError> {
    let id = viewer.user_id().ok_or(FeedError::Unauthenticated)?;
    if !viewer.is_moderator() {
        return Err(FeedError::Forbidden);
    }
    Ok(id)
}

/// File a report against an entry. Every submission is recorded — the same
/// viewer reporting the same entry twice yields two pending reports, by
/// design.
pub async fn submit_report(
    store: &dyn Store,
    viewer: &Viewer,
    entry_id: Uuid,
    reason: String,
) -> Result<Report, FeedError> {
    let reporter_id = viewer.user_id().ok_or(FeedError::Unauthenticated)?;

    if store.fetch_entry(entry_id).await?.is_none() {
        return Err(FeedError::NotFound);
    }

    let report = Report {
        id: Uuid::new_v4(),
        entry_id,
        reporter_id,
        reason,
        status: ReportStatus::Pending,
        created_at: Utc::now(),
    };
    store.insert_report(&report).await?;

    info!("Report {} filed against entry {}", report.id, entry_id);
    Ok(report)
}

/// Close a report without touching the entry.
pub async fn dismiss_report(
    store: &dyn Store,
    viewer: &Viewer,
    report_id: Uuid,
) -> Result<Report, FeedError> {
    require_moderator(viewer)?;

    let report = store
        .get_report(report_id)
        .await?
        .ok_or(FeedError::NotFound)?;
    if report.status.is_terminal() {
        return Err(FeedError::Conflict);
    }

    if !store
        .transition_report(report_id, ReportStatus::Dismissed)
        .await?
    {
        // Lost a race against another moderator action.
        return Err(FeedError::Conflict);
    }

    Ok(Report {
        status: ReportStatus::Dismissed,
        ..report
    })
}

/// Uphold a report: delete the entry (reactions and replies cascade), then
/// mark the report resolved. An entry already deleted by another path makes
/// step one a no-op and the workflow proceeds to step two.
pub async fn resolve_report(
    store: &dyn Store,
    viewer: &Viewer,
    report_id: Uuid,
) -> Result<Report, FeedError> {
    require_moderator(viewer)?;

    let report = store
        .get_report(report_id)
        .await?
        .ok_or(FeedError::NotFound)?;
    if report.status.is_terminal() {
        return Err(FeedError::Conflict);
    }

    let deleted = store.delete_entry(report.entry_id).await?;
    if !deleted {
        debug!("Entry {} already absent while resolving report {}", report.entry_id, report_id);
    }

    if !store
        .transition_report(report_id, ReportStatus::Resolved)
        .await?
    {
        return Err(FeedError::Conflict);
    }

    info!("Report {} resolved, entry {} removed", report_id, report.entry_id);
    Ok(Report {
        status: ReportStatus::Resolved,
        ..report
    })
}

/// Self-service delete, available to the author and to moderators without
/// any report involved. Pending reports against the entry become orphaned
/// references and stay informational. Deleting an absent entry is a no-op.
pub async fn delete_entry(
    store: &dyn Store,
    viewer: &Viewer,
    entry_id: Uuid,
) -> Result<(), FeedError> {
    let user_id = viewer.user_id().ok_or(FeedError::Unauthenticated)?;

    let Some(entry) = store.fetch_entry(entry_id).await? else {
        return Ok(());
    };
    if entry.author_id != user_id && !viewer.is_moderator() {
        return Err(FeedError::Forbidden);
    }

    store.delete_entry(entry_id).await?;
    info!("Entry {} deleted by {}", entry_id, user_id);
    Ok(())
}

/// The moderation queue, moderator only.
pub async fn list_reports(
    store: &dyn Store,
    viewer: &Viewer,
) -> Result<Vec<ReportDetail>, FeedError> {
    require_moderator(viewer)?;
    store.list_reports().await
}
