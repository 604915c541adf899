//! Pure visibility predicate, applied uniformly wherever entries are listed
//! (main feed, profile history, search, single-entry views).

use std::collections::HashSet;

use echo_types::models::{Entry, Scope, Viewer};
use uuid::Uuid;

/// Source of circle-membership facts. The relationship graph itself is an
/// external collaborator; the predicate only ever sees the answer. Swapping
/// the backing data (follows table, invite list, ...) touches nothing here.
pub trait CircleMembership {
    /// Whether the given author counts the current viewer in their circle.
    fn contains(&self, author_id: Uuid) -> bool;
}

impl CircleMembership for HashSet<Uuid> {
    fn contains(&self, author_id: Uuid) -> bool {
        HashSet::contains(self, &author_id)
    }
}

/// Conservative default: no membership data available, so every circle
/// check fails closed.
pub struct NoCircles;

impl CircleMembership for NoCircles {
    fn contains(&self, _author_id: Uuid) -> bool {
        false
    }
}

/// Whether `viewer` may see `entry`. Unrecognized scope values were already
/// collapsed to `Private` when the entry was decoded, so the unknown case
/// fails closed here by construction.
pub fn is_visible(entry: &Entry, viewer: &Viewer, circles: &dyn CircleMembership) -> bool {
    match entry.scope {
        Scope::Public => true,
        Scope::Community => viewer.is_authenticated(),
        // Membership only ever widens access for signed-in viewers; an
        // anonymous viewer fails the circle check no matter what the
        // membership source claims.
        Scope::Circle => match viewer.user_id() {
            Some(uid) => uid == entry.author_id || circles.contains(entry.author_id),
            None => false,
        },
        Scope::Private => viewer.user_id() == Some(entry.author_id),
    }
}
