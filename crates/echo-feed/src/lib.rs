//! Feed aggregation and engagement consistency engine.
//!
//! Keeps three independently-updated facts — the entry list, the aggregate
//! engagement counts, and the viewer's own reaction — mutually consistent
//! across paginated, asynchronous, and optimistic operations. Storage is
//! behind the [`store::Store`] trait so the engine runs unchanged against
//! SQLite in production and an in-memory fake in tests.

pub mod engagement;
pub mod error;
pub mod moderation;
pub mod store;
pub mod view;
pub mod visibility;

pub use engagement::{EntryCard, ToggleOutcome};
pub use error::FeedError;
pub use store::Store;
pub use view::{FeedFilter, FeedPage, FeedView, LoadPhase, PAGE_SIZE};
