//! OpenAPI specification generation for the skyhook API.
//!
//! The specification drives the bundled Swagger UI and the web frontend's
//! generated client. Descriptions are written for field technicians as much
//! as for developers.

use axum::Json;
use utoipa::OpenApi;

// Import all the handler modules to reference their types
use super::actions::TriggerResponse;
use super::config::{ConfigResponse, HardwareConfigResponse, SerialConfigResponse};
use super::dumps::DumpListResponse;
use super::error::ErrorResponse;
use super::hardware::HardwareTestResponse;
use super::health::HealthResponse;
use super::status::{ButtonsResponse, StatusResponse};

/// Serve the OpenAPI specification as JSON.
///
/// This endpoint is available at `/api/openapi.json` and returns the
/// complete OpenAPI 3.0 specification for the skyhook API.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as a string (for writing to file).
/// Used by the gen-openapi binary.
#[allow(dead_code)]
pub fn get_openapi_json() -> String {
    ApiDoc::openapi()
        .to_pretty_json()
        .expect("Failed to serialize OpenAPI spec")
}

/// Main OpenAPI document structure for skyhook.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "skyhook API",
        version = "0.1.0",
        description = r#"
# skyhook API

skyhook recovers configuration dumps from crashed flight controllers in the
field. It runs on a Raspberry Pi carried to the crash site.

## Overview

This API provides:

1. **Status**: exclusive mode, device presence, button levels, and the
   latest extraction outcome
2. **Actions**: trigger a configuration dump or a Bluetooth pairing window,
   exactly as the physical buttons do
3. **Dumps**: list stored captures and download their content
4. **Hardware tests**: exercise the LED strip and buzzer during setup

## Behavior

- Triggers return immediately: 202 when the exclusive mode was won, 409
  when another operation holds it. Outcomes surface via `/status`.
- While a dump or pairing window runs, the serial-to-TCP bridge is down;
  it returns within a second of the system going idle again.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local skyhook server")
    ),
    tags(
        (
            name = "system",
            description = "Health checks and system status"
        ),
        (
            name = "actions",
            description = "Dump and pairing triggers"
        ),
        (
            name = "dumps",
            description = "Stored configuration captures"
        ),
        (
            name = "config",
            description = "Startup configuration (read-only)"
        ),
        (
            name = "hardware",
            description = "LED/buzzer pass-through tests"
        )
    ),
    paths(
        // Health endpoints
        super::health::health_check,
        // Status endpoints
        super::status::get_status,
        // Action endpoints
        super::actions::trigger_action,
        // Dump endpoints
        super::dumps::list_dumps,
        super::dumps::get_dump,
        // Config endpoints
        super::config::get_config,
        // Hardware endpoints
        super::hardware::test_hardware,
    ),
    components(
        schemas(
            // Error types
            ErrorResponse,
            // Health types
            HealthResponse,
            // Status types
            StatusResponse,
            ButtonsResponse,
            // Action types
            TriggerResponse,
            // Dump types
            DumpListResponse,
            // Config types
            ConfigResponse,
            SerialConfigResponse,
            HardwareConfigResponse,
            // Hardware types
            HardwareTestResponse,
        )
    )
)]
pub struct ApiDoc;
