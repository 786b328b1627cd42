//! School Site Backend
//!
//! Content store for a school website: SQLite snapshot persistence, optional
//! remote document store mirroring, and Tantivy full-text search.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod remote;
mod search;
mod store;

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::Sessions;
use config::{Config, LogFormat};
use db::Repository;
use remote::{HttpRemote, RemoteBackend};
use search::SearchIndex;
use store::ContentStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ContentStore>,
    pub sessions: Arc<Sessions>,
    pub search: Arc<SearchIndex>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();

    tracing::info!("Starting School Site Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Remote document store, when fully configured
    let remote: Option<Arc<dyn RemoteBackend>> = match &config.remote {
        Some(remote_config) => {
            tracing::info!("Remote store: {}", remote_config.base_url);
            Some(Arc::new(HttpRemote::new(remote_config)?))
        }
        None => {
            tracing::info!("No remote store configured; using local storage only");
            None
        }
    };

    // Initialize database and search index
    let pool = db::init_database(&config.db_path).await?;
    let store = Arc::new(ContentStore::new(
        Repository::new(pool),
        config.storage_key.clone(),
        remote,
    ));
    let search = Arc::new(SearchIndex::open(&config.index_path)?);

    let state = AppState {
        store: store.clone(),
        sessions: Arc::new(Sessions::new()),
        search: search.clone(),
    };

    // Load content in the background; the API answers LOADING until done
    tokio::spawn(async move {
        store.initialize().await;
        tracing::info!("Building search index...");
        if let Err(e) = search.rebuild_from(&store).await {
            tracing::error!("Failed to build search index: {}", e);
        }
    });

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

    let sessions = state.sessions.clone();

    // Public site
    let public_routes = Router::new()
        .route("/content", get(api::get_public_content))
        .route("/settings", get(api::get_settings))
        .route("/pages/{page}", get(api::get_page))
        .route("/notices", get(api::list_notices))
        .route("/notices/latest", get(api::latest_notice))
        .route("/blogs", get(api::list_blogs))
        .route("/blogs/{id}", get(api::get_blog))
        .route("/blogs/{id}/related", get(api::related_blogs))
        .route("/gallery", get(api::list_gallery))
        .route("/search", get(api::search_content))
        .route("/contact", post(api::submit_contact))
        .route("/admissions/apply", post(api::submit_application))
        .route("/auth/login", post(api::login));

    // Admin panel, session required
    let admin_routes = Router::new()
        .route("/auth/logout", post(api::logout))
        .route("/admin/content", get(api::get_admin_content))
        .route("/admin/dashboard", get(api::get_dashboard))
        // Notices
        .route("/admin/notices", post(api::create_notice))
        .route(
            "/admin/notices/{id}",
            put(api::update_notice).delete(api::delete_notice),
        )
        .route("/admin/notices/{id}/latest", put(api::set_latest_notice))
        // Blogs
        .route(
            "/admin/blogs",
            get(api::list_all_blogs).post(api::create_blog),
        )
        .route(
            "/admin/blogs/{id}",
            put(api::update_blog).delete(api::delete_blog),
        )
        // Gallery
        .route("/admin/gallery", post(api::create_gallery_item))
        .route(
            "/admin/gallery/{id}",
            put(api::update_gallery_item).delete(api::delete_gallery_item),
        )
        // Pages, settings, credentials
        .route("/admin/pages/{page}", put(api::update_page))
        .route("/admin/settings", put(api::update_settings))
        .route("/admin/credentials", put(api::update_credentials))
        // Messages
        .route("/admin/messages", get(api::list_messages))
        .route("/admin/messages/{id}/read", put(api::mark_message_read))
        .route("/admin/messages/{id}", delete(api::delete_message))
        // Backup
        .route("/admin/export", get(api::export_content))
        .route("/admin/import", post(api::import_content))
        .route("/admin/sync-log", get(api::get_sync_log))
        // Apply session auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::session_auth_layer(sessions.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    let api_routes = public_routes
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), api::loading_guard));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint. Not ready until content has loaded.
async fn health_check(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.store.is_loading() {
        (StatusCode::SERVICE_UNAVAILABLE, "LOADING")
    } else {
        (StatusCode::OK, "OK")
    }
}
