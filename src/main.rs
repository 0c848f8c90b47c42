//! Conference Central Backend
//!
//! REST backend for conference organization: seat registration, session
//! wishlists, filtered conference queries and cached announcements, with
//! SQLite persistence.

mod api;
mod auth;
mod cache;
mod config;
mod db;
mod errors;
mod models;
mod query;
mod tasks;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cache::CacheSlots;
use config::Config;
use db::Repository;
use tasks::TaskDispatcher;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub slots: Arc<CacheSlots>,
    pub tasks: TaskDispatcher,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Conference Central Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (CONFERENCE_API_PSK). Authentication is disabled!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Derived caches and the worker that refreshes them
    let slots = Arc::new(CacheSlots::new());
    let (dispatcher, _worker) = TaskDispatcher::start(repo.clone(), slots.clone());
    let _ticker = tasks::schedule_announcements(dispatcher.clone(), config.announcement_interval);
    tracing::info!(
        "Announcement refresh every {}s",
        config.announcement_interval.as_secs()
    );

    // Create application state
    let state = AppState {
        repo,
        slots,
        tasks: dispatcher,
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

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        // Profile
        .route("/profile", get(api::get_profile).post(api::save_profile))
        // Conferences
        .route("/conferences", post(api::create_event))
        .route("/conferences/created", get(api::events_created))
        .route("/conferences/attending", get(api::events_attending))
        .route("/conferences/query", post(api::query_events))
        .route(
            "/conferences/{key}",
            get(api::get_event).put(api::update_event),
        )
        .route(
            "/conferences/{key}/registration",
            post(api::register_for_event).delete(api::unregister_from_event),
        )
        // Sessions
        .route(
            "/conferences/{key}/sessions",
            get(api::sessions_for_event).post(api::create_session),
        )
        .route(
            "/conferences/{key}/sessions/type/{session_type}",
            get(api::sessions_by_type),
        )
        .route(
            "/conferences/{key}/sessions/before",
            get(api::sessions_before),
        )
        .route(
            "/conferences/{key}/sessions/after",
            get(api::sessions_after),
        )
        .route("/sessions/speakers", get(api::sessions_by_speakers))
        .route(
            "/sessions/excluding-types",
            post(api::sessions_excluding_types),
        )
        // Wishlist
        .route("/wishlist", get(api::get_wishlist))
        .route(
            "/wishlist/{session_key}",
            post(api::add_to_wishlist).delete(api::remove_from_wishlist),
        )
        // Cached summaries
        .route("/announcement", get(api::get_announcement))
        .route("/featured-speaker", get(api::get_featured_speaker))
        .route("/tasks/announcement", post(api::trigger_announcement))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
