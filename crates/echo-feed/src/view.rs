//! Page cursor management and per-feed view state.
//!
//! Each feed instance (home tab, profile history, search results) owns one
//! [`FeedView`]: an explicit state struct updated by reducer-style
//! transitions driven by fetch and mutation results, independent of any UI
//! lifecycle. Responses carry a generation token so a page fetched for a
//! superseded filter configuration is discarded, never applied.

use std::collections::HashSet;

use uuid::Uuid;

use crate::engagement::{enrich, EntryCard};
use crate::error::FeedError;
use crate::store::Store;
use crate::visibility::is_visible;
use echo_types::models::{Entry, Scope, Viewer};

/// Fixed page size for every feed window.
pub const PAGE_SIZE: u32 = 10;

/// Query configuration for one feed instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFilter {
    /// Scope tab. `None` shows every visible scope.
    pub scope: Option<Scope>,
    /// Restrict to one author (profile history).
    pub author: Option<Uuid>,
    /// Substring search over headline and reflection.
    pub search: Option<String>,
}

/// One fetched window plus the "more available" signal. `has_more` is
/// derived from whether the page came back full; a concurrent deletion can
/// make a full page the true last one, which is an accepted approximation.
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub items: Vec<EntryCard>,
    pub has_more: bool,
}

/// Initial load replaces the list (full skeleton); load-more appends
/// (trailing spinner). The two must never be conflated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    InitialLoad,
    LoadingMore,
}

/// Handed out when a load starts; must be presented to apply the result.
/// A token minted before a filter change no longer matches the view's
/// generation and its page is dropped.
#[derive(Debug, Clone, Copy)]
pub struct PageToken {
    generation: u64,
    page: u32,
    replace: bool,
}

impl PageToken {
    pub fn page(&self) -> u32 {
        self.page
    }
}

#[derive(Debug)]
pub struct FeedView {
    viewer: Viewer,
    filter: FeedFilter,
    items: Vec<EntryCard>,
    next_page: u32,
    has_more: bool,
    phase: LoadPhase,
    generation: u64,
}

impl FeedView {
    pub fn new(viewer: Viewer) -> Self {
        Self::with_filter(viewer, FeedFilter::default())
    }

    pub fn with_filter(viewer: Viewer, filter: FeedFilter) -> Self {
        Self {
            viewer,
            filter,
            items: Vec::new(),
            next_page: 0,
            has_more: true,
            phase: LoadPhase::Idle,
            generation: 0,
        }
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn filter(&self) -> &FeedFilter {
        &self.filter
    }

    pub fn items(&self) -> &[EntryCard] {
        &self.items
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn card(&self, entry_id: Uuid) -> Option<&EntryCard> {
        self.items.iter().find(|c| c.entry.id == entry_id)
    }

    pub(crate) fn card_mut(&mut self, entry_id: Uuid) -> Option<&mut EntryCard> {
        self.items.iter_mut().find(|c| c.entry.id == entry_id)
    }

    pub(crate) fn replace_card(&mut self, entry_id: Uuid, card: EntryCard) {
        if let Some(slot) = self.card_mut(entry_id) {
            *slot = card;
        }
    }

    pub(crate) fn remove_card(&mut self, entry_id: Uuid) {
        self.items.retain(|c| c.entry.id != entry_id);
    }

    /// Switch the query configuration: back to page 0, accumulated items
    /// discarded, and any in-flight response invalidated.
    pub fn set_filter(&mut self, filter: FeedFilter) {
        if filter == self.filter {
            return;
        }
        self.filter = filter;
        self.reset();
    }

    fn reset(&mut self) {
        self.items.clear();
        self.next_page = 0;
        self.has_more = true;
        self.phase = LoadPhase::Idle;
        self.generation += 1;
    }

    /// Start a load that replaces the current list.
    pub fn begin_initial_load(&mut self) -> PageToken {
        self.phase = LoadPhase::InitialLoad;
        PageToken {
            generation: self.generation,
            page: 0,
            replace: true,
        }
    }

    /// Start appending the next page. `None` when there is nothing further
    /// to fetch or a load is already running.
    pub fn begin_load_more(&mut self) -> Option<PageToken> {
        if !self.has_more || self.phase != LoadPhase::Idle {
            return None;
        }
        self.phase = LoadPhase::LoadingMore;
        Some(PageToken {
            generation: self.generation,
            page: self.next_page,
            replace: false,
        })
    }

    /// Apply a fetched page. Returns false (and changes nothing) when the
    /// token is stale — the filter changed while the request was in flight.
    pub fn apply_page(&mut self, token: PageToken, page: FeedPage) -> bool {
        if token.generation != self.generation {
            tracing::debug!("Discarding stale page {} (superseded filter)", token.page);
            return false;
        }

        if token.replace {
            self.items = page.items;
        } else {
            self.items.extend(page.items);
        }
        self.next_page = token.page + 1;
        self.has_more = page.has_more;
        self.phase = LoadPhase::Idle;
        true
    }

    /// A load failed: drop back to idle so the user can retry. Items and
    /// cursor are untouched.
    pub fn fail_page(&mut self, token: PageToken) {
        if token.generation == self.generation {
            self.phase = LoadPhase::Idle;
        }
    }
}

/// `fetchPage`: one visibility-filtered, engagement-enriched window.
///
/// The store already filters rows to the viewer; the pure predicate runs
/// again here over the decoded scopes so a row that slipped through (or
/// decoded to an unexpected scope) is still dropped. Enrichment and the
/// circle lookup are one batched store call each.
pub async fn fetch_page(
    store: &dyn Store,
    filter: &FeedFilter,
    viewer: &Viewer,
    page_index: u32,
) -> Result<FeedPage, FeedError> {
    // The page index arrives from the query string; an index whose offset
    // overflows u32 is past the end of any feed.
    let Some(offset) = page_index.checked_mul(PAGE_SIZE) else {
        return Ok(FeedPage {
            items: Vec::new(),
            has_more: false,
        });
    };

    let rows = store.fetch_page(filter, viewer, PAGE_SIZE, offset).await?;
    let has_more = rows.len() as u32 == PAGE_SIZE;

    let circles = circle_set(store, &rows, viewer).await?;
    let visible: Vec<Entry> = rows
        .into_iter()
        .filter(|e| is_visible(e, viewer, &circles))
        .collect();

    let items = enrich(store, visible, viewer).await?;
    Ok(FeedPage { items, has_more })
}

/// Batched circle membership for the authors of circle-scoped rows on this
/// page. Anonymous viewers are never members of anything.
pub(crate) async fn circle_set(
    store: &dyn Store,
    rows: &[Entry],
    viewer: &Viewer,
) -> Result<HashSet<Uuid>, FeedError> {
    let Some(viewer_id) = viewer.user_id() else {
        return Ok(HashSet::new());
    };

    let authors: Vec<Uuid> = rows
        .iter()
        .filter(|e| e.scope == Scope::Circle && e.author_id != viewer_id)
        .map(|e| e.author_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    if authors.is_empty() {
        return Ok(HashSet::new());
    }
    store.circle_authors(&authors, viewer_id).await
}

/// Drive an initial load end to end: mint a token, fetch, apply.
pub async fn load_initial(view: &mut FeedView, store: &dyn Store) -> Result<(), FeedError> {
    let token = view.begin_initial_load();
    let filter = view.filter.clone();
    let viewer = view.viewer;
    match fetch_page(store, &filter, &viewer, token.page()).await {
        Ok(page) => {
            view.apply_page(token, page);
            Ok(())
        }
        Err(e) => {
            view.fail_page(token);
            Err(e)
        }
    }
}

/// Drive one load-more step. Returns false when there was nothing to load.
pub async fn load_more(view: &mut FeedView, store: &dyn Store) -> Result<bool, FeedError> {
    let Some(token) = view.begin_load_more() else {
        return Ok(false);
    };
    let filter = view.filter.clone();
    let viewer = view.viewer;
    match fetch_page(store, &filter, &viewer, token.page()).await {
        Ok(page) => Ok(view.apply_page(token, page)),
        Err(e) => {
            view.fail_page(token);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> FeedView {
        FeedView::new(Viewer::user(Uuid::new_v4()))
    }

    #[test]
    fn filter_change_resets_cursor_and_invalidates_tokens() {
        let mut v = view();
        let token = v.begin_initial_load();

        v.set_filter(FeedFilter {
            scope: Some(Scope::Community),
            ..Default::default()
        });

        // The in-flight response belongs to the old configuration.
        assert!(!v.apply_page(
            token,
            FeedPage {
                items: vec![],
                has_more: true
            }
        ));
        assert_eq!(v.phase(), LoadPhase::Idle);
        assert!(v.items().is_empty());
    }

    #[test]
    fn setting_identical_filter_keeps_state() {
        let mut v = view();
        let token = v.begin_initial_load();
        v.set_filter(FeedFilter::default());
        assert!(v.apply_page(
            token,
            FeedPage {
                items: vec![],
                has_more: false
            }
        ));
        assert!(!v.has_more());
    }

    #[test]
    fn load_more_gated_on_has_more_and_phase() {
        let mut v = view();
        let token = v.begin_initial_load();
        // no second load while one is running
        assert!(v.begin_load_more().is_none());

        v.apply_page(
            token,
            FeedPage {
                items: vec![],
                has_more: false,
            },
        );
        assert!(v.begin_load_more().is_none());
    }

    #[test]
    fn failed_load_returns_to_idle_for_retry() {
        let mut v = view();
        let token = v.begin_initial_load();
        assert_eq!(v.phase(), LoadPhase::InitialLoad);
        v.fail_page(token);
        assert_eq!(v.phase(), LoadPhase::Idle);
    }
}
