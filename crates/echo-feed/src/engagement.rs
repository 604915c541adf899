//! Engagement aggregation and the optimistic reaction controller.

use serde::Serialize;
use uuid::Uuid;

use crate::error::FeedError;
use crate::store::Store;
use crate::view::{circle_set, FeedView};
use crate::visibility::is_visible;
use echo_types::models::{Entry, ReactionKind, Viewer};

/// One entry as a viewer sees it: the row itself plus aggregate counts and
/// the viewer's own reaction flag.
#[derive(Debug, Clone, Serialize)]
pub struct EntryCard {
    #[serde(flatten)]
    pub entry: Entry,
    pub reaction_count: i64,
    pub reply_count: i64,
    /// Always false for anonymous viewers.
    pub viewer_reacted: bool,
}

/// Result of a settled reaction toggle, reflecting local view state.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ToggleOutcome {
    pub reacted: bool,
    pub reaction_count: i64,
}

/// Merge raw entries with engagement counts and the viewer's reaction flag.
/// Exactly two store round trips per page (one for the counts, one for the
/// viewer lookup), independent of page size.
pub async fn enrich(
    store: &dyn Store,
    entries: Vec<Entry>,
    viewer: &Viewer,
) -> Result<Vec<EntryCard>, FeedError> {
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = entries.iter().map(|e| e.id).collect();
    let counts = store.engagement_counts(&ids).await?;

    let reacted = match viewer.user_id() {
        Some(user_id) => store.reacted_by(&ids, user_id).await?,
        None => Default::default(),
    };

    Ok(entries
        .into_iter()
        .map(|entry| {
            let c = counts.get(&entry.id).copied().unwrap_or_default();
            let viewer_reacted = reacted.contains(&entry.id);
            EntryCard {
                entry,
                reaction_count: c.reactions,
                reply_count: c.replies,
                viewer_reacted,
            }
        })
        .collect())
}

/// Fetch one entry as a card, visibility-checked for `viewer`. `Ok(None)`
/// means gone *or* not visible — callers cannot distinguish the two, which
/// is the point.
pub async fn entry_card(
    store: &dyn Store,
    entry_id: Uuid,
    viewer: &Viewer,
) -> Result<Option<EntryCard>, FeedError> {
    let Some(entry) = store.fetch_entry(entry_id).await? else {
        return Ok(None);
    };

    let rows = std::slice::from_ref(&entry);
    let circles = circle_set(store, rows, viewer).await?;
    if !is_visible(&entry, viewer, &circles) {
        return Ok(None);
    }

    let cards = enrich(store, vec![entry], viewer).await?;
    Ok(cards.into_iter().next())
}

/// Toggle the viewer's reaction on an entry in the current view.
///
/// The local flip is applied *before* the store call so the user never
/// waits on the round trip. The store's UNIQUE(entry, user) constraint is
/// authoritative; on any store failure the optimistic delta is discarded
/// and the card is reconciled by re-reading its aggregate state, never by
/// inverse-patching (the flip may have silently succeeded server-side).
pub async fn toggle_reaction(
    store: &dyn Store,
    view: &mut FeedView,
    entry_id: Uuid,
    kind: ReactionKind,
) -> Result<ToggleOutcome, FeedError> {
    let viewer = *view.viewer();
    let user_id = viewer.user_id().ok_or(FeedError::Unauthenticated)?;

    // Stale IDs from a superseded view are not actionable.
    let card = view.card_mut(entry_id).ok_or(FeedError::NotFound)?;

    let reacting = !card.viewer_reacted;
    card.viewer_reacted = reacting;
    card.reaction_count += if reacting { 1 } else { -1 };
    let outcome = ToggleOutcome {
        reacted: reacting,
        reaction_count: card.reaction_count,
    };

    let result = if reacting {
        store.insert_reaction(entry_id, user_id, kind).await
    } else {
        store.remove_reaction(entry_id, user_id).await
    };

    match result {
        Ok(()) => Ok(outcome),
        // Duplicate insert: the reaction is already there, so the toggle is
        // idempotent success. Refetch to converge on the authoritative row.
        Err(FeedError::Conflict) => {
            reconcile(store, view, entry_id, &viewer).await?;
            Ok(settled_outcome(view, entry_id, outcome))
        }
        Err(e) => {
            reconcile(store, view, entry_id, &viewer).await?;
            Err(e)
        }
    }
}

/// Replace the local guess for one entry with a fresh read. A fresh read
/// always supersedes optimistic state; an entry that no longer exists (or
/// is no longer visible) is dropped from the view.
async fn reconcile(
    store: &dyn Store,
    view: &mut FeedView,
    entry_id: Uuid,
    viewer: &Viewer,
) -> Result<(), FeedError> {
    match entry_card(store, entry_id, viewer).await? {
        Some(card) => view.replace_card(entry_id, card),
        None => view.remove_card(entry_id),
    }
    Ok(())
}

fn settled_outcome(view: &FeedView, entry_id: Uuid, fallback: ToggleOutcome) -> ToggleOutcome {
    match view.card(entry_id) {
        Some(card) => ToggleOutcome {
            reacted: card.viewer_reacted,
            reaction_count: card.reaction_count,
        },
        None => fallback,
    }
}
