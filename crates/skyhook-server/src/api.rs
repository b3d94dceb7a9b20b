//! HTTP API routes and handlers.
//!
//! This module contains all HTTP endpoint implementations organized by domain:
//! - `status` - System status snapshots
//! - `actions` - Dump and pairing triggers
//! - `dumps` - Stored capture listing and retrieval
//! - `config` - Startup configuration (read-only)
//! - `hardware` - LED/buzzer pass-through tests
//! - `health` - Service health checks
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::SharedState;

pub mod actions;
pub mod config;
pub mod dumps;
pub mod error;
pub mod hardware;
pub mod health;
pub mod openapi;
pub mod status;

// Re-export commonly used types
#[allow(unused_imports)]
pub use error::{ApiError, ApiResult, ErrorResponse};

// Re-export OpenAPI utilities for the gen-openapi binary
#[allow(unused_imports)]
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                       - Health check
/// /api
/// ├── /status                   - System status snapshot
/// ├── /action/{dump|pair}       - Exclusive operation triggers
/// ├── /dumps                    - Stored captures
/// ├── /dumps/{filename}         - One capture's content
/// ├── /config                   - Startup configuration
/// ├── /test/hardware/{component}- LED/buzzer pass-through
/// └── /openapi.json             - OpenAPI specification
/// /swagger-ui                   - Interactive API docs
/// ```
pub fn create_router(state: SharedState) -> Router {
    // Initialize server start time for uptime tracking
    status::init_start_time();

    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .nest("/status", status::router())
                .nest("/action", actions::router())
                .nest("/dumps", dumps::router())
                .nest("/config", config::router())
                .nest("/test", hardware::router())
                // OpenAPI spec at /api/openapi.json
                .route("/openapi.json", get(openapi::get_openapi_spec)),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        // The frontend is served from a different origin on the field
        // hotspot; keep CORS wide open like the rest of the device surface.
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
