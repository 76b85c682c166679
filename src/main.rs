//! Loyalty Points Service - Main Application Entry Point
//!
//! This is a REST API server for a multi-business rewards program. Users earn
//! and spend points per business, and single-use QR codes bridge a
//! point-of-sale action to a points transaction.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: Bearer API token with SHA-256 hashing
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;

use tracing_subscriber::EnvFilter;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{config::Config, db::DbPool};

/// Shared application state passed to every handler.
///
/// The pool is the only shared mutable resource between requests; the config
/// is read-only after startup. Both are injected explicitly instead of living
/// in module-level globals.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Config,
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

    let addr = format!("0.0.0.0:{}", config.server_port);
    let state = AppState { pool, config };

    // Create authenticated routes (API endpoints)
    let authenticated_routes = Router::new()
        // Points ledger routes
        .route("/api/v1/points/add", post(handlers::points::add_points))
        .route(
            "/api/v1/points/deduct",
            post(handlers::points::deduct_points),
        )
        .route(
            "/api/v1/points/balance/{business_id}",
            get(handlers::points::get_balance),
        )
        .route("/api/v1/points/history", get(handlers::points::get_history))
        .route(
            "/api/v1/points/expiring",
            get(handlers::points::get_expiring),
        )
        // QR transaction routes
        .route("/api/v1/qr/generate", post(handlers::qr::generate_qr))
        .route("/api/v1/qr/process/{code}", post(handlers::qr::process_qr))
        .route("/api/v1/qr/cancel/{code}", post(handlers::qr::cancel_qr))
        .route("/api/v1/qr/status/{code}", get(handlers::qr::get_status))
        .route("/api/v1/qr/history", get(handlers::qr::get_history))
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    // Combine authenticated routes with public routes
    let app = Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        // Merge authenticated routes
        .merge(authenticated_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // Share state with all handlers via State extraction
        .with_state(state);

    // Bind to network address and start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app).await?;

    Ok(())
}
