use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use echo_api::auth::{self, AppState, AppStateInner};
use echo_api::middleware::{attach_viewer, require_auth};
use echo_api::{activity, entries, feed, files, follows, reactions, replies, reports};
use echo_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "echo=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("ECHO_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("ECHO_DB_PATH").unwrap_or_else(|_| "echo.db".into());
    let host = std::env::var("ECHO_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("ECHO_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = Database::open(&PathBuf::from(&db_path))?;
    promote_moderators(&db)?;

    let app_state: AppState = Arc::new(AppStateInner::new(db, jwt_secret));

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    // Entry routes serve signed-out users for reads; an Authorization
    // header, if present, must still be valid. Mutation handlers reject
    // anonymous viewers themselves.
    let viewer_routes = Router::new()
        .route("/feed", get(feed::get_feed))
        .route("/entries", post(entries::create_entry))
        .route(
            "/entries/{entry_id}",
            get(entries::get_entry).delete(entries::delete_entry),
        )
        .route(
            "/entries/{entry_id}/replies",
            get(replies::list_replies).post(replies::create_reply),
        )
        .route("/entries/{entry_id}/reactions", post(reactions::toggle_reaction))
        .route("/entries/{entry_id}/reports", post(reports::submit_report))
        .layer(middleware::from_fn(attach_viewer))
        .with_state(app_state.clone());

    let file_routes = Router::new()
        .route("/files/{file_id}", get(files::download_file))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/activity", get(activity::get_activity))
        .route("/reports", get(reports::list_reports))
        .route("/reports/{report_id}/dismiss", post(reports::dismiss_report))
        .route("/reports/{report_id}/resolve", post(reports::resolve_report))
        .route("/files", post(files::upload_file))
        .route(
            "/circle/{user_id}",
            post(follows::add_to_circle).delete(follows::remove_from_circle),
        )
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(viewer_routes)
        .merge(file_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Echo server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// ECHO_MODERATORS is a comma-separated list of usernames granted the
/// moderator role at startup. Accounts that don't exist yet are skipped
/// with a warning; register them and restart.
fn promote_moderators(db: &Database) -> anyhow::Result<()> {
    let Ok(names) = std::env::var("ECHO_MODERATORS") else {
        return Ok(());
    };

    for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        match db.get_user_by_username(name)? {
            Some(user) => {
                db.set_moderator(&user.id, true)?;
                info!("Granted moderator role to {}", name);
            }
            None => warn!("ECHO_MODERATORS names unknown user '{}'", name),
        }
    }

    Ok(())
}
