//! System status API endpoint.
//!
//! Reports a consistent snapshot of the exclusive mode, device presence,
//! debounced button levels, and the latest extraction outcome.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use skyhook_core::DumpRecord;

use crate::state::SharedState;

/// Creates the status router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(get_status))
}

// ============================================================================
// Response Types
// ============================================================================

/// Debounced button levels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct ButtonsResponse {
    /// Dump trigger button pressed.
    #[schema(example = false)]
    pub dump: bool,
    /// Pairing trigger button pressed.
    #[schema(example = false)]
    pub pair: bool,
}

/// System status response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "mode": "IDLE",
    "device_connected": true,
    "port": "/dev/ttyACM0",
    "device_description": "STM32 Virtual ComPort",
    "buttons": {"dump": false, "pair": false},
    "latest_dump": {
        "filename": "dump_20250115-093042.txt",
        "created_at": "2025-01-15T09:30:42Z",
        "size_bytes": 48213,
        "firmware": "Betaflight / STM32F405 (S405) 4.4.0"
    },
    "last_error": null,
    "uptime_secs": 3600
}))]
pub struct StatusResponse {
    /// Current exclusive mode.
    #[schema(example = "IDLE")]
    pub mode: String,

    /// Whether the target device is attached.
    #[schema(example = true)]
    pub device_connected: bool,

    /// Serial path the device is (or would be) reached at.
    #[schema(example = "/dev/ttyACM0")]
    pub port: String,

    /// Descriptor of the detected device, when known.
    #[schema(example = "STM32 Virtual ComPort")]
    pub device_description: Option<String>,

    /// Debounced button levels.
    pub buttons: ButtonsResponse,

    /// Most recent successful extraction, if any.
    pub latest_dump: Option<DumpRecord>,

    /// Outcome message of the most recent failed extraction, if any.
    pub last_error: Option<String>,

    /// Server uptime in seconds.
    #[schema(example = 3600)]
    pub uptime_secs: u64,
}

// ============================================================================
// Static state for uptime tracking
// ============================================================================

use std::sync::OnceLock;
use std::time::Instant;

static SERVER_START_TIME: OnceLock<Instant> = OnceLock::new();

/// Initialize the server start time. Call this once at startup.
pub fn init_start_time() {
    SERVER_START_TIME.get_or_init(Instant::now);
}

/// Get server uptime in seconds.
fn get_uptime_secs() -> u64 {
    SERVER_START_TIME
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

// ============================================================================
// Handler
// ============================================================================

/// Get system status.
#[utoipa::path(
    get,
    path = "/status",
    tag = "system",
    operation_id = "getStatus",
    summary = "Get system status",
    description = "Returns a consistent snapshot of the exclusive mode, device \
        presence, button levels, and the latest extraction outcome. The \
        snapshot is taken under the mode controller's lock, so the reported \
        mode and connection state belong to the same instant.",
    responses(
        (status = 200, description = "Status retrieved", body = StatusResponse)
    )
)]
pub async fn get_status(State(state): State<SharedState>) -> Json<StatusResponse> {
    let snapshot = state.controller.snapshot();

    // The in-memory outcome survives only since startup; fall back to the
    // newest file on disk so status is useful right after a restart.
    let latest_dump = match snapshot.last_dump {
        Some(record) => Some(record),
        None => state.dumps.latest().unwrap_or_default(),
    };

    Json(StatusResponse {
        mode: snapshot.mode.to_string(),
        device_connected: snapshot.connection.present,
        port: snapshot.connection.path,
        device_description: snapshot.connection.description,
        buttons: ButtonsResponse {
            dump: snapshot.buttons.dump,
            pair: snapshot.buttons.pair,
        },
        latest_dump,
        last_error: snapshot.last_dump_error,
        uptime_secs: get_uptime_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_response_serialization() {
        let response = StatusResponse {
            mode: "IDLE".to_string(),
            device_connected: true,
            port: "/dev/ttyACM0".to_string(),
            device_description: None,
            buttons: ButtonsResponse {
                dump: false,
                pair: false,
            },
            latest_dump: None,
            last_error: None,
            uptime_secs: 12,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"mode\":\"IDLE\""));
        assert!(json.contains("\"device_connected\":true"));
    }
}
