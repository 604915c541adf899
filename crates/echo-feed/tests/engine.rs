//! Engine tests against an in-memory store fake.
//!
//! The fake mirrors the real store's contract: row-level visibility on
//! `fetch_page`, at most one reaction per (entry, user), cascading deletes,
//! and a pending-only report transition. It can also be told to fail the
//! next reaction write to exercise rollback-by-refetch.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use echo_feed::engagement::{entry_card, toggle_reaction};
use echo_feed::moderation;
use echo_feed::store::{EngagementCounts, Store};
use echo_feed::view::{fetch_page, load_initial, load_more, FeedFilter, FeedView, PAGE_SIZE};
use echo_feed::FeedError;
use echo_types::api::ReportDetail;
use echo_types::models::{Entry, ReactionKind, Reply, Report, ReportStatus, Scope, Viewer};

#[derive(Default)]
struct Inner {
    entries: Vec<Entry>,
    reactions: HashMap<(Uuid, Uuid), ReactionKind>,
    replies: Vec<Reply>,
    reports: HashMap<Uuid, Report>,
    /// (author, member): author counts member in their circle.
    circles: HashSet<(Uuid, Uuid)>,
    fail_next_reaction: Option<FeedError>,
}

#[derive(Default)]
struct FakeStore {
    inner: Mutex<Inner>,
}

impl FakeStore {
    fn add_entry(&self, author: Uuid, scope: Scope, seq: i64) -> Uuid {
        let id = Uuid::new_v4();
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        self.inner.lock().unwrap().entries.push(Entry {
            id,
            author_id: author,
            headline: format!("entry {}", seq),
            reflection: "reflection".into(),
            scope,
            tags: vec![],
            mood_tone: "neutral".into(),
            image_url: None,
            is_anonymous: false,
            created_at: base + Duration::seconds(seq),
        });
        id
    }

    fn seed_reaction(&self, entry_id: Uuid, user_id: Uuid) {
        self.inner
            .lock()
            .unwrap()
            .reactions
            .insert((entry_id, user_id), ReactionKind::Like);
    }

    fn reaction_rows(&self, entry_id: Uuid) -> usize {
        self.inner
            .lock()
            .unwrap()
            .reactions
            .keys()
            .filter(|(e, _)| *e == entry_id)
            .count()
    }

    fn fail_next_reaction(&self, err: FeedError) {
        self.inner.lock().unwrap().fail_next_reaction = Some(err);
    }

    fn report_status(&self, id: Uuid) -> Option<ReportStatus> {
        self.inner.lock().unwrap().reports.get(&id).map(|r| r.status)
    }

    fn entry_exists(&self, id: Uuid) -> bool {
        self.inner.lock().unwrap().entries.iter().any(|e| e.id == id)
    }
}

fn row_visible(e: &Entry, viewer: &Viewer, circles: &HashSet<(Uuid, Uuid)>) -> bool {
    match viewer.user_id() {
        None => e.scope == Scope::Public,
        Some(uid) => match e.scope {
            Scope::Public | Scope::Community => true,
            Scope::Private => e.author_id == uid,
            Scope::Circle => e.author_id == uid || circles.contains(&(e.author_id, uid)),
        },
    }
}

#[async_trait]
impl Store for FakeStore {
    async fn fetch_page(
        &self,
        filter: &FeedFilter,
        viewer: &Viewer,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Entry>, FeedError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<Entry> = inner
            .entries
            .iter()
            .filter(|e| row_visible(e, viewer, &inner.circles))
            .filter(|e| filter.scope.is_none_or(|s| e.scope == s))
            .filter(|e| filter.author.is_none_or(|a| e.author_id == a))
            .filter(|e| {
                filter.search.as_deref().is_none_or(|q| {
                    e.headline.contains(q) || e.reflection.contains(q)
                })
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn fetch_entry(&self, id: Uuid) -> Result<Option<Entry>, FeedError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .entries
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn engagement_counts(
        &self,
        entry_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, EngagementCounts>, FeedError> {
        let inner = self.inner.lock().unwrap();
        let mut out: HashMap<Uuid, EngagementCounts> = HashMap::new();
        for id in entry_ids {
            let reactions = inner.reactions.keys().filter(|(e, _)| e == id).count() as i64;
            let replies = inner.replies.iter().filter(|r| r.entry_id == *id).count() as i64;
            out.insert(*id, EngagementCounts { reactions, replies });
        }
        Ok(out)
    }

    async fn reacted_by(
        &self,
        entry_ids: &[Uuid],
        user_id: Uuid,
    ) -> Result<HashSet<Uuid>, FeedError> {
        let inner = self.inner.lock().unwrap();
        Ok(entry_ids
            .iter()
            .filter(|id| inner.reactions.contains_key(&(**id, user_id)))
            .copied()
            .collect())
    }

    async fn circle_authors(
        &self,
        author_ids: &[Uuid],
        viewer_id: Uuid,
    ) -> Result<HashSet<Uuid>, FeedError> {
        let inner = self.inner.lock().unwrap();
        Ok(author_ids
            .iter()
            .filter(|a| inner.circles.contains(&(**a, viewer_id)))
            .copied()
            .collect())
    }

    async fn insert_reaction(
        &self,
        entry_id: Uuid,
        user_id: Uuid,
        kind: ReactionKind,
    ) -> Result<(), FeedError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.fail_next_reaction.take() {
            return Err(err);
        }
        if !inner.entries.iter().any(|e| e.id == entry_id) {
            return Err(FeedError::NotFound);
        }
        if inner.reactions.contains_key(&(entry_id, user_id)) {
            return Err(FeedError::Conflict);
        }
        inner.reactions.insert((entry_id, user_id), kind);
        Ok(())
    }

    async fn remove_reaction(&self, entry_id: Uuid, user_id: Uuid) -> Result<(), FeedError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.fail_next_reaction.take() {
            return Err(err);
        }
        inner.reactions.remove(&(entry_id, user_id));
        Ok(())
    }

    async fn delete_entry(&self, entry_id: Uuid) -> Result<bool, FeedError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.entries.len();
        inner.entries.retain(|e| e.id != entry_id);
        let existed = inner.entries.len() != before;
        if existed {
            inner.reactions.retain(|(e, _), _| *e != entry_id);
            inner.replies.retain(|r| r.entry_id != entry_id);
        }
        Ok(existed)
    }

    async fn insert_report(&self, report: &Report) -> Result<(), FeedError> {
        self.inner
            .lock()
            .unwrap()
            .reports
            .insert(report.id, report.clone());
        Ok(())
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<Report>, FeedError> {
        Ok(self.inner.lock().unwrap().reports.get(&id).cloned())
    }

    async fn transition_report(&self, id: Uuid, to: ReportStatus) -> Result<bool, FeedError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.reports.get_mut(&id) {
            Some(r) if r.status == ReportStatus::Pending => {
                r.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_reports(&self) -> Result<Vec<ReportDetail>, FeedError> {
        let inner = self.inner.lock().unwrap();
        let mut reports: Vec<Report> = inner.reports.values().cloned().collect();
        reports.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(reports
            .into_iter()
            .map(|report| {
                let entry = inner.entries.iter().find(|e| e.id == report.entry_id).cloned();
                ReportDetail {
                    report,
                    reporter_username: None,
                    entry,
                }
            })
            .collect())
    }
}

// -- Pagination --

#[tokio::test]
async fn community_feed_paginates_fifteen_entries_into_two_pages() {
    let store = FakeStore::default();
    let author = Uuid::new_v4();
    for i in 0..15 {
        store.add_entry(author, Scope::Community, i);
    }

    let mut view = FeedView::with_filter(
        Viewer::user(Uuid::new_v4()),
        FeedFilter {
            scope: Some(Scope::Community),
            ..Default::default()
        },
    );

    load_initial(&mut view, &store).await.unwrap();
    assert_eq!(view.items().len(), PAGE_SIZE as usize);
    assert!(view.has_more());

    assert!(load_more(&mut view, &store).await.unwrap());
    assert_eq!(view.items().len(), 15);
    assert!(!view.has_more());

    assert!(!load_more(&mut view, &store).await.unwrap());
}

#[tokio::test]
async fn concatenated_pages_cover_exactly_the_visible_set_once() {
    let store = FakeStore::default();
    let author = Uuid::new_v4();
    let viewer_id = Uuid::new_v4();

    let mut expected = HashSet::new();
    for i in 0..12 {
        expected.insert(store.add_entry(author, Scope::Public, i));
    }
    for i in 12..19 {
        expected.insert(store.add_entry(author, Scope::Community, i));
    }
    // invisible to this viewer
    for i in 19..24 {
        store.add_entry(author, Scope::Private, i);
    }
    for i in 24..27 {
        store.add_entry(author, Scope::Circle, i);
    }

    let mut view = FeedView::new(Viewer::user(viewer_id));
    load_initial(&mut view, &store).await.unwrap();
    while view.has_more() {
        load_more(&mut view, &store).await.unwrap();
    }

    let got: Vec<Uuid> = view.items().iter().map(|c| c.entry.id).collect();
    assert_eq!(got.len(), expected.len(), "each visible entry exactly once");
    assert_eq!(got.iter().copied().collect::<HashSet<_>>(), expected);

    let times: Vec<_> = view.items().iter().map(|c| c.entry.created_at).collect();
    assert!(times.windows(2).all(|w| w[0] >= w[1]), "newest first");
}

#[tokio::test]
async fn anonymous_viewer_gets_public_rows_only() {
    let store = FakeStore::default();
    let author = Uuid::new_v4();
    store.add_entry(author, Scope::Public, 0);
    store.add_entry(author, Scope::Community, 1);
    store.add_entry(author, Scope::Private, 2);

    let page = fetch_page(&store, &FeedFilter::default(), &Viewer::Anonymous, 0)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].entry.scope, Scope::Public);
    assert!(!page.items[0].viewer_reacted);
}

#[tokio::test]
async fn circle_entries_visible_only_to_members() {
    let store = FakeStore::default();
    let author = Uuid::new_v4();
    let member = Uuid::new_v4();
    let outsider = Uuid::new_v4();
    store.add_entry(author, Scope::Circle, 0);
    store.inner.lock().unwrap().circles.insert((author, member));

    let member_page = fetch_page(&store, &FeedFilter::default(), &Viewer::user(member), 0)
        .await
        .unwrap();
    assert_eq!(member_page.items.len(), 1);

    let outsider_page = fetch_page(&store, &FeedFilter::default(), &Viewer::user(outsider), 0)
        .await
        .unwrap();
    assert!(outsider_page.items.is_empty());
}

#[tokio::test]
async fn huge_page_index_is_an_empty_page_not_a_panic() {
    let store = FakeStore::default();
    store.add_entry(Uuid::new_v4(), Scope::Public, 0);

    let page = fetch_page(&store, &FeedFilter::default(), &Viewer::Anonymous, u32::MAX)
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert!(!page.has_more);
}

#[tokio::test]
async fn search_matches_headline_or_reflection() {
    let store = FakeStore::default();
    let author = Uuid::new_v4();
    {
        let id = store.add_entry(author, Scope::Public, 0);
        let mut inner = store.inner.lock().unwrap();
        let e = inner.entries.iter_mut().find(|e| e.id == id).unwrap();
        e.headline = "rainy morning".into();
    }
    store.add_entry(author, Scope::Public, 1);

    let page = fetch_page(
        &store,
        &FeedFilter {
            search: Some("rainy".into()),
            ..Default::default()
        },
        &Viewer::Anonymous,
        0,
    )
    .await
    .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].entry.headline, "rainy morning");
}

// -- Optimistic reaction toggling --

async fn loaded_view(store: &FakeStore, viewer: Viewer) -> FeedView {
    let mut view = FeedView::new(viewer);
    load_initial(&mut view, store).await.unwrap();
    view
}

#[tokio::test]
async fn double_toggle_returns_to_baseline_with_at_most_one_row() {
    let store = FakeStore::default();
    let entry = store.add_entry(Uuid::new_v4(), Scope::Public, 0);
    let user = Uuid::new_v4();
    let mut view = loaded_view(&store, Viewer::user(user)).await;

    let on = toggle_reaction(&store, &mut view, entry, ReactionKind::Like)
        .await
        .unwrap();
    assert!(on.reacted);
    assert_eq!(on.reaction_count, 1);
    assert_eq!(store.reaction_rows(entry), 1);

    let off = toggle_reaction(&store, &mut view, entry, ReactionKind::Like)
        .await
        .unwrap();
    assert!(!off.reacted);
    assert_eq!(off.reaction_count, 0);
    assert_eq!(store.reaction_rows(entry), 0);
}

#[tokio::test]
async fn rejected_toggle_rolls_back_to_server_state() {
    let store = FakeStore::default();
    let entry = store.add_entry(Uuid::new_v4(), Scope::Public, 0);
    let user = Uuid::new_v4();
    let mut view = loaded_view(&store, Viewer::user(user)).await;

    store.fail_next_reaction(FeedError::Transient("store offline".into()));
    let err = toggle_reaction(&store, &mut view, entry, ReactionKind::Like)
        .await
        .unwrap_err();
    assert!(matches!(err, FeedError::Transient(_)));

    // Reconciled by refetch: the card shows the server truth, not the guess.
    let card = view.card(entry).unwrap();
    assert!(!card.viewer_reacted);
    assert_eq!(card.reaction_count, 0);
    assert_eq!(store.reaction_rows(entry), 0);
}

#[tokio::test]
async fn duplicate_insert_is_idempotent_success() {
    let store = FakeStore::default();
    let entry = store.add_entry(Uuid::new_v4(), Scope::Public, 0);
    let user = Uuid::new_v4();

    // View was loaded before the reaction landed (e.g. a second tab).
    let mut view = loaded_view(&store, Viewer::user(user)).await;
    store.seed_reaction(entry, user);

    let outcome = toggle_reaction(&store, &mut view, entry, ReactionKind::Like)
        .await
        .unwrap();
    assert!(outcome.reacted);
    assert_eq!(outcome.reaction_count, 1);
    assert_eq!(store.reaction_rows(entry), 1, "constraint held, no second row");
}

#[tokio::test]
async fn anonymous_toggle_is_rejected_without_mutation() {
    let store = FakeStore::default();
    let entry = store.add_entry(Uuid::new_v4(), Scope::Public, 0);
    let mut view = loaded_view(&store, Viewer::Anonymous).await;

    let err = toggle_reaction(&store, &mut view, entry, ReactionKind::Like)
        .await
        .unwrap_err();
    assert_eq!(err, FeedError::Unauthenticated);
    assert_eq!(store.reaction_rows(entry), 0);
    assert!(!view.card(entry).unwrap().viewer_reacted);
}

#[tokio::test]
async fn stale_entry_id_is_not_actionable() {
    let store = FakeStore::default();
    store.add_entry(Uuid::new_v4(), Scope::Public, 0);
    let mut view = loaded_view(&store, Viewer::user(Uuid::new_v4())).await;

    let err = toggle_reaction(&store, &mut view, Uuid::new_v4(), ReactionKind::Like)
        .await
        .unwrap_err();
    assert_eq!(err, FeedError::NotFound);
}

#[tokio::test]
async fn failed_toggle_on_deleted_entry_drops_the_card() {
    let store = FakeStore::default();
    let entry = store.add_entry(Uuid::new_v4(), Scope::Public, 0);
    let user = Uuid::new_v4();
    let mut view = loaded_view(&store, Viewer::user(user)).await;

    // The entry vanishes while the toggle is in flight.
    store.delete_entry(entry).await.unwrap();
    let err = toggle_reaction(&store, &mut view, entry, ReactionKind::Like)
        .await
        .unwrap_err();
    assert_eq!(err, FeedError::NotFound);
    assert!(view.card(entry).is_none(), "refetch found nothing, card dropped");
}

// -- Moderation workflow --

#[tokio::test]
async fn report_lifecycle_reaches_terminal_state_once() {
    let store = FakeStore::default();
    let entry = store.add_entry(Uuid::new_v4(), Scope::Public, 0);
    let reporter = Viewer::user(Uuid::new_v4());
    let moderator = Viewer::moderator(Uuid::new_v4());

    let report = moderation::submit_report(&store, &reporter, entry, "spam".into())
        .await
        .unwrap();
    assert_eq!(report.status, ReportStatus::Pending);

    let dismissed = moderation::dismiss_report(&store, &moderator, report.id)
        .await
        .unwrap();
    assert_eq!(dismissed.status, ReportStatus::Dismissed);
    assert!(store.entry_exists(entry), "dismissal leaves the entry alone");

    // Terminal states are frozen.
    assert_eq!(
        moderation::dismiss_report(&store, &moderator, report.id).await,
        Err(FeedError::Conflict)
    );
    assert_eq!(
        moderation::resolve_report(&store, &moderator, report.id).await,
        Err(FeedError::Conflict)
    );
    assert_eq!(store.report_status(report.id), Some(ReportStatus::Dismissed));
}

#[tokio::test]
async fn resolve_deletes_entry_then_marks_resolved() {
    let store = FakeStore::default();
    let entry = store.add_entry(Uuid::new_v4(), Scope::Public, 0);
    let reporter = Viewer::user(Uuid::new_v4());
    let moderator = Viewer::moderator(Uuid::new_v4());

    let report = moderation::submit_report(&store, &reporter, entry, "harassment".into())
        .await
        .unwrap();
    let resolved = moderation::resolve_report(&store, &moderator, report.id)
        .await
        .unwrap();

    assert_eq!(resolved.status, ReportStatus::Resolved);
    assert!(!store.entry_exists(entry));
}

#[tokio::test]
async fn resolve_is_safe_when_entry_already_gone() {
    let store = FakeStore::default();
    let author = Uuid::new_v4();
    let entry = store.add_entry(author, Scope::Public, 0);
    let reporter = Viewer::user(Uuid::new_v4());
    let moderator = Viewer::moderator(Uuid::new_v4());

    let report = moderation::submit_report(&store, &reporter, entry, "spam".into())
        .await
        .unwrap();

    // Author self-deletes before the moderator gets to it.
    moderation::delete_entry(&store, &Viewer::user(author), entry)
        .await
        .unwrap();

    let resolved = moderation::resolve_report(&store, &moderator, report.id)
        .await
        .unwrap();
    assert_eq!(resolved.status, ReportStatus::Resolved);
}

#[tokio::test]
async fn moderator_actions_forbidden_for_regular_users() {
    let store = FakeStore::default();
    let entry = store.add_entry(Uuid::new_v4(), Scope::Public, 0);
    let reporter = Viewer::user(Uuid::new_v4());

    let report = moderation::submit_report(&store, &reporter, entry, "spam".into())
        .await
        .unwrap();

    assert_eq!(
        moderation::dismiss_report(&store, &reporter, report.id).await,
        Err(FeedError::Forbidden)
    );
    assert_eq!(
        moderation::resolve_report(&store, &reporter, report.id).await,
        Err(FeedError::Forbidden)
    );
    assert_eq!(
        moderation::dismiss_report(&store, &Viewer::Anonymous, report.id).await,
        Err(FeedError::Unauthenticated)
    );
    assert_eq!(store.report_status(report.id), Some(ReportStatus::Pending));
    assert!(store.entry_exists(entry));
}

#[tokio::test]
async fn self_delete_checks_ownership_and_is_idempotent() {
    let store = FakeStore::default();
    let author = Uuid::new_v4();
    let entry = store.add_entry(author, Scope::Public, 0);

    assert_eq!(
        moderation::delete_entry(&store, &Viewer::user(Uuid::new_v4()), entry).await,
        Err(FeedError::Forbidden)
    );
    assert!(store.entry_exists(entry));

    moderation::delete_entry(&store, &Viewer::user(author), entry)
        .await
        .unwrap();
    assert!(!store.entry_exists(entry));

    // Deleting an absent entry is a no-op success.
    moderation::delete_entry(&store, &Viewer::user(author), entry)
        .await
        .unwrap();
}

#[tokio::test]
async fn orphaned_reports_stay_informational_in_the_queue() {
    let store = FakeStore::default();
    let author = Uuid::new_v4();
    let entry = store.add_entry(author, Scope::Public, 0);
    let reporter = Viewer::user(Uuid::new_v4());
    let moderator = Viewer::moderator(Uuid::new_v4());

    let first = moderation::submit_report(&store, &reporter, entry, "spam".into())
        .await
        .unwrap();
    // No dedup: a second submission against the same entry is recorded too.
    let second = moderation::submit_report(&store, &reporter, entry, "spam again".into())
        .await
        .unwrap();
    assert_ne!(first.id, second.id);

    moderation::resolve_report(&store, &moderator, first.id)
        .await
        .unwrap();

    let queue = moderation::list_reports(&store, &moderator).await.unwrap();
    assert_eq!(queue.len(), 2);
    assert!(queue.iter().all(|d| d.entry.is_none()), "targets deleted, reports orphaned");
    let second_in_queue = queue.iter().find(|d| d.report.id == second.id).unwrap();
    assert_eq!(second_in_queue.report.status, ReportStatus::Pending);

    assert_eq!(
        moderation::list_reports(&store, &reporter).await,
        Err(FeedError::Forbidden)
    );
}

// -- Stale responses and single-entry views --

#[tokio::test]
async fn page_for_superseded_filter_is_discarded() {
    let store = FakeStore::default();
    let author = Uuid::new_v4();
    for i in 0..3 {
        store.add_entry(author, Scope::Public, i);
    }

    let mut view = FeedView::new(Viewer::Anonymous);
    let token = view.begin_initial_load();
    let page = fetch_page(&store, &FeedFilter::default(), &Viewer::Anonymous, token.page())
        .await
        .unwrap();

    // User switches tabs while the request is in flight.
    view.set_filter(FeedFilter {
        search: Some("nothing".into()),
        ..Default::default()
    });

    assert!(!view.apply_page(token, page));
    assert!(view.items().is_empty());
}

#[tokio::test]
async fn entry_card_hides_invisible_entries() {
    let store = FakeStore::default();
    let author = Uuid::new_v4();
    let entry = store.add_entry(author, Scope::Private, 0);

    let seen = entry_card(&store, entry, &Viewer::user(author)).await.unwrap();
    assert!(seen.is_some());

    let hidden = entry_card(&store, entry, &Viewer::user(Uuid::new_v4()))
        .await
        .unwrap();
    assert!(hidden.is_none(), "gone and not-visible are indistinguishable");
}
