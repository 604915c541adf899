//! HTTP surface over the feed engine: axum handlers, JWT middleware, and
//! the SQLite-backed [`store::SqliteStore`].

use axum::http::StatusCode;

use echo_feed::FeedError;

pub mod activity;
pub mod auth;
pub mod entries;
pub mod feed;
pub mod files;
pub mod follows;
pub mod middleware;
pub mod reactions;
pub mod replies;
pub mod reports;
pub mod store;

/// Engine failures mapped onto HTTP. Transient store trouble is a 502 so
/// clients can tell "retry later" from "you did something wrong".
pub fn http_status(err: FeedError) -> StatusCode {
    match err {
        FeedError::Unauthenticated => StatusCode::UNAUTHORIZED,
        FeedError::Forbidden => StatusCode::FORBIDDEN,
        FeedError::NotFound => StatusCode::NOT_FOUND,
        FeedError::Conflict => StatusCode::CONFLICT,
        FeedError::Transient(msg) => {
            tracing::error!("Store failure surfaced to client: {}", msg);
            StatusCode::BAD_GATEWAY
        }
    }
}
