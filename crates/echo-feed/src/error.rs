use thiserror::Error;

/// Failure taxonomy for engine operations. Every variant is recovered at the
/// boundary that issued the action; a failed mutation degrades to "state
/// reverted, message shown", never an unwound view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The action requires a signed-in viewer. Recovered by prompting
    /// sign-in; never retried automatically.
    #[error("sign-in required")]
    Unauthenticated,

    /// Authenticated but lacking the required role or ownership.
    #[error("not allowed")]
    Forbidden,

    /// The referenced entry or report vanished, e.g. a raced deletion.
    #[error("not found")]
    NotFound,

    /// Uniqueness violation or an invalid lifecycle transition. Duplicate
    /// reactions are treated as idempotent success by the caller.
    #[error("conflicting state")]
    Conflict,

    /// Store or network unavailability. Optimistic state is rolled back via
    /// refetch; the user gets a retry affordance, no automatic retry loop.
    #[error("store unavailable: {0}")]
    Transient(String),
}
