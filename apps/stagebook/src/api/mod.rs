//! # Stagebook HTTP API Module
//!
//! JSON API over the entity store and analytics, built on axum.
//!
//! ## Endpoints
//!
//! - `GET /health`, `GET /status`
//! - `/organisations`, `/contacts`, `/projects`: list, create, get, patch, delete
//! - `GET /contacts/{id}/projects`: reverse directory lookup
//! - `/projects/{id}/directory`: list, add-or-get, remove
//! - `/projects/{id}/allocations`, `PATCH`/`DELETE /allocations/{id}`: stage budgets
//! - `/time-entries`: list and log
//! - `/analytics/projects/{id}`, `/analytics/projects/{id}/stages/{stage}`,
//!   `/analytics/portfolio`: burn and risk
//! - `GET /reports/directory/{id}/csv`, `GET /reports/analytics/{id}/csv`:
//!   spreadsheet downloads
//! - `POST /export`: base64 snapshot
//!
//! Deletes are soft: the row is returned with `is_active: false`.
//!
//! ## Security Configuration
//!
//! - `cors_origins`: allowed origins, or `["*"]` for all (default: localhost only)
//! - `rate_limit`: requests per second (default: 100, 0 leaves the limiter out)
//! - `api_key`: if set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod reports;
mod types;

pub use auth::key_matches;
pub use middleware::create_rate_limiter;
pub use types::{
    AllocationJson, AllocationRequest, AllocationUpdateRequest, ApiError, ContactQuery,
    DirectoryQuery, DirectoryRequest, ErrorBody, ErrorDetail, ExportResponse, HealthResponse,
    OrganisationQuery, PortfolioQuery, PortfolioResponse, ProjectBurnJson, ProjectPerformanceJson,
    ProjectQuery, RollupJson, StageBreakdownJson, StageBurnJson, StatusResponse, TimeEntryJson,
    TimeEntryQuery, TimeEntryRequest, UnallocatedJson, VisibilityQuery, status_for,
};

use crate::config::ServerConfig;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
};
use stagebook_core::{Session, StagebookError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the session.
#[derive(Clone)]
pub struct AppState {
    /// Writers serialise every mutation; readers share a consistent view.
    pub session: Arc<RwLock<Session>>,
}

impl AppState {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// Build the CORS layer from configured origins.
///
/// - `["*"]`: any origin (development only)
/// - empty: localhost only
/// - otherwise: the listed origins; invalid entries are skipped
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
        return CorsLayer::permissive();
    }
    if origins.is_empty() {
        tracing::info!("CORS: No origins configured, defaulting to localhost only");
        return build_localhost_cors();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(hv) => {
                tracing::info!("CORS: Allowing origin: {}", origin);
                Some(hv)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
        return build_localhost_cors();
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate limiting (if enabled)
/// 5. Authentication (if an API key is configured)
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route(
            "/organisations",
            get(handlers::list_organisations_handler).post(handlers::create_organisation_handler),
        )
        .route(
            "/organisations/{id}",
            get(handlers::get_organisation_handler)
                .patch(handlers::update_organisation_handler)
                .delete(handlers::deactivate_organisation_handler),
        )
        .route(
            "/contacts",
            get(handlers::list_contacts_handler).post(handlers::create_contact_handler),
        )
        .route(
            "/contacts/{id}",
            get(handlers::get_contact_handler)
                .patch(handlers::update_contact_handler)
                .delete(handlers::deactivate_contact_handler),
        )
        .route(
            "/contacts/{id}/projects",
            get(handlers::contact_projects_handler),
        )
        .route(
            "/projects",
            get(handlers::list_projects_handler).post(handlers::create_project_handler),
        )
        .route(
            "/projects/{id}",
            get(handlers::get_project_handler)
                .patch(handlers::update_project_handler)
                .delete(handlers::deactivate_project_handler),
        )
        .route(
            "/projects/{id}/directory",
            get(handlers::project_directory_handler).post(handlers::add_directory_entry_handler),
        )
        .route(
            "/projects/{id}/directory/{entry_id}",
            delete(handlers::remove_directory_entry_handler),
        )
        .route(
            "/projects/{id}/allocations",
            get(handlers::list_allocations_handler).post(handlers::allocate_handler),
        )
        .route(
            "/allocations/{id}",
            patch(handlers::update_allocation_handler)
                .delete(handlers::deactivate_allocation_handler),
        )
        .route(
            "/time-entries",
            get(handlers::list_time_entries_handler).post(handlers::log_time_handler),
        )
        .route(
            "/analytics/projects/{id}",
            get(handlers::project_performance_handler),
        )
        .route(
            "/analytics/projects/{id}/stages/{stage}",
            get(handlers::stage_burn_handler),
        )
        .route("/analytics/portfolio", get(handlers::portfolio_handler))
        .route(
            "/reports/directory/{id}/csv",
            get(handlers::directory_csv_handler),
        )
        .route(
            "/reports/analytics/{id}/csv",
            get(handlers::analytics_csv_handler),
        )
        .route("/export", post(handlers::export_handler))
        .fallback(handlers::not_found_handler);

    // Authentication (innermost - runs last on request)
    match config.api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            router = router.layer(axum_middleware::from_fn_with_state(
                auth::ApiKey::from(key),
                auth::api_key_auth_middleware,
            ));
        }
        None => {
            tracing::warn!(
                "API key authentication DISABLED - all endpoints are publicly accessible! \
                 Set STAGEBOOK_API_KEY to enable authentication."
            );
        }
    }

    if config.rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", config.rate_limit);
        router = router.layer(axum_middleware::from_fn_with_state(
            create_rate_limiter(config.rate_limit),
            middleware::rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(config.body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(&config.cors_origins)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server; returns after Ctrl+C.
pub async fn run_server(session: Session, config: &ServerConfig) -> Result<(), StagebookError> {
    let addr = config.address();
    let router = create_router(AppState::new(session), config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| StagebookError::Storage(format!("Bind failed on {}: {}", addr, e)))?;

    tracing::info!("Stagebook HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StagebookError::Storage(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
