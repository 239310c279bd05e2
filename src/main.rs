//! CTI Auth Service - Main Application Entry Point
//!
//! This is the API-key registry and authentication service for the cyber
//! threat intelligence API. It persists issued keys with their organization
//! labels and usage statistics, authenticates bearer tokens on behalf of the
//! data-serving routes, and exposes an administrator-gated management surface
//! for issuing, listing, disabling, and revoking keys.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: SQLite with sqlx (async queries)
//! - **Authentication**: bearer API keys, plus a separate admin secret for management
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Seed the bootstrap API keys if the registry is empty
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod state;

use tracing_subscriber::EnvFilter;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, patch, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::key_registry::KeyRegistry;
use crate::state::AppState;

/// Build the application router.
///
/// Three route groups:
/// - `/health`: public
/// - `/api/v1/me`: behind the bearer-key middleware
/// - `/api/v1/admin/*`: behind the admin-credential middleware
///
/// The two credential checks stay separate middlewares so their failure
/// modes stay distinct.
fn app(state: AppState) -> Router {
    // Key management routes, gated by the administrator secret
    let admin_routes = Router::new()
        .route("/api/v1/admin/keys", post(handlers::keys::issue_key))
        .route("/api/v1/admin/keys", get(handlers::keys::list_keys))
        .route(
            "/api/v1/admin/keys/{key}",
            patch(handlers::keys::set_key_active),
        )
        .route(
            "/api/v1/admin/keys/{key}",
            delete(handlers::keys::revoke_key),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::admin::admin_middleware,
        ));

    // Routes that authenticate with an issued API key
    let authenticated_routes = Router::new()
        .route("/api/v1/me", get(handlers::keys::current_key))
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        // Merge protected route groups
        .merge(admin_routes)
        .merge(authenticated_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // The API is consumed from browser clients on other origins
        .layer(CorsLayer::permissive())
        // Share registry and admin secret with all handlers via State extraction
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // Seed bootstrap keys on first start; no-op on an already-populated registry
    let registry = KeyRegistry::new(pool);
    registry.initialize().await?;
    tracing::info!("Key registry initialized");

    let state = AppState {
        registry,
        admin_password: config.admin_password.clone(),
    };
    let app = app(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app).await?;

    Ok(())
}
