//! Komuni Backend
//!
//! REST backend for the Komuni accessibility map: barrier reports, accounts
//! and the admin dashboard, with SQLite persistence and Tantivy full-text search.

mod api;
mod auth;
mod config;
mod content;
mod db;
mod errors;
mod geocode;
mod map;
mod models;
mod search;
mod storage;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, LogFormat};
use db::Repository;
use geocode::Geocoder;
use search::SearchIndex;
use storage::ObjectStore;

/// Room left for multipart boundaries and the report JSON next to an image.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub geocoder: Arc<Geocoder>,
    pub storage: Arc<ObjectStore>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Plain => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!("Starting Komuni Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Upload directory: {:?}", config.upload_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.admin_api_key.is_none() {
        tracing::warn!("No admin API key configured (KOMUNI_ADMIN_API_KEY). Admin routes need an admin session");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let purged = repo.purge_expired_sessions().await?;
    if purged > 0 {
        tracing::info!("Purged {} expired sessions", purged);
    }

    // Initialize search index
    let search = Arc::new(SearchIndex::open(&config.index_path)?);

    // Build initial search index from database
    tracing::info!("Building search index...");
    let reports = repo.list_reports().await?;
    search.rebuild(&reports).await?;

    let geocoder = Arc::new(Geocoder::new(
        &config.geocoder_url,
        config.geocoder_timeout_secs,
    )?);
    let storage = Arc::new(ObjectStore::open(
        &config.upload_dir,
        &config.public_upload_url,
        config.max_upload_bytes,
    )?);

    // Create application state
    let state = AppState {
        repo,
        search,
        geocoder,
        storage,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.storage.max_bytes() + MULTIPART_OVERHEAD;

    // API routes
    let api_routes = Router::new()
        // Reports
        .route("/reports", get(api::list_reports).post(api::create_report))
        .route("/reports/submit", post(api::submit_report))
        .route("/reports/search", get(api::search_reports))
        .route(
            "/reports/{id}",
            get(api::get_report)
                .put(api::update_report)
                .delete(api::delete_report),
        )
        .route("/reports/{id}/comments", post(api::add_comment))
        .route("/uploads", post(api::upload_image))
        // Map
        .route("/map/markers", get(api::list_markers))
        .route("/map/click", post(api::map_click))
        .route("/map/close", post(api::close_sidebar))
        .route("/map/reports/{id}/edit", get(api::edit_sidebar))
        .route("/geocode/reverse", get(api::reverse_geocode))
        .route("/geocode/search", get(api::search_location))
        // Accounts
        .route("/auth/register", post(api::register))
        .route("/auth/login", post(api::login))
        .route("/auth/logout", post(api::logout))
        .route("/auth/me", get(api::current_user))
        .route("/auth/verify-email", post(api::verify_email))
        .route("/auth/password-reset", post(api::request_password_reset))
        .route("/profile", get(api::get_profile).put(api::update_profile))
        // Public content
        .route("/contact", post(api::send_contact))
        .route("/team", get(api::list_team))
        .route("/blog", get(api::list_posts))
        .route("/blog/{slug}", get(api::get_post))
        .route("/faq", get(api::list_faq))
        // Admin
        .route("/admin/stats", get(api::get_stats))
        .route("/admin/dashboard", get(api::get_dashboard))
        .route("/admin/contacts", get(api::list_contacts))
        .route("/admin/contacts/{id}/read", put(api::mark_contact_read))
        .route("/admin/users", get(api::list_users))
        .route("/admin/users/import", post(api::import_users))
        .route("/admin/users/{id}", delete(api::delete_user))
        .route("/admin/users/{id}/promote", post(api::promote_user))
        .route("/admin/users/{id}/demote", post(api::demote_user))
        .route("/admin/team", post(api::create_team_member))
        .route("/admin/team/{id}", delete(api::delete_team_member))
        .layer(DefaultBodyLimit::max(body_limit));

    // Health check and stored images
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .nest_service("/uploads", ServeDir::new(state.storage.root()));

    Router::new()
        .nest("/api", api_routes)
        .merge(public_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
