//! Configuration API endpoint.
//!
//! Read-only view of the configuration the process was started with.
//! Configuration is loaded once at startup and immutable thereafter, so
//! there is no update surface; edits happen in the TOML file followed by a
//! service restart.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::SharedState;

/// Creates the config router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(get_config))
}

// ============================================================================
// Response Types
// ============================================================================

/// Current configuration response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "serial": {"port": "/dev/ttyACM0", "baud": 115200},
    "hardware": {
        "button_dump_pin": 23,
        "button_pair_pin": 24,
        "led_pin": 18,
        "led_count": 4,
        "buzzer_pin": 25
    },
    "dump_directory": "/var/lib/skyhook/dumps",
    "silence_threshold_ms": 500,
    "read_timeout_secs": 10,
    "pairing_window_secs": 30,
    "bridge_tcp_port": 5000,
    "cloud_sync_enabled": false
}))]
pub struct ConfigResponse {
    /// Serial device defaults.
    pub serial: SerialConfigResponse,

    /// GPIO pin assignments.
    pub hardware: HardwareConfigResponse,

    /// Directory that receives dump files.
    #[schema(example = "/var/lib/skyhook/dumps")]
    pub dump_directory: String,

    /// Capture ends once no byte has arrived for this long.
    #[schema(example = 500)]
    pub silence_threshold_ms: u64,

    /// Absolute ceiling on a capture session.
    #[schema(example = 10)]
    pub read_timeout_secs: u64,

    /// Radio discoverability window.
    #[schema(example = 30)]
    pub pairing_window_secs: u64,

    /// TCP port the bridge listens on.
    #[schema(example = 5000)]
    pub bridge_tcp_port: u16,

    /// Whether new dumps are handed to the cloud sync collaborator.
    #[schema(example = false)]
    pub cloud_sync_enabled: bool,
}

/// Serial section of the configuration response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SerialConfigResponse {
    /// Fallback device path.
    #[schema(example = "/dev/ttyACM0")]
    pub port: String,

    /// CLI session baud rate.
    #[schema(example = 115_200)]
    pub baud: u32,
}

/// Hardware section of the configuration response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HardwareConfigResponse {
    /// Dump button pin (BCM).
    #[schema(example = 23)]
    pub button_dump_pin: u8,

    /// Pair button pin (BCM).
    #[schema(example = 24)]
    pub button_pair_pin: u8,

    /// LED strip data pin (BCM).
    #[schema(example = 18)]
    pub led_pin: u8,

    /// Number of LEDs on the strip.
    #[schema(example = 4)]
    pub led_count: u8,

    /// Buzzer pin (BCM).
    #[schema(example = 25)]
    pub buzzer_pin: u8,
}

// ============================================================================
// Handler
// ============================================================================

/// Get the startup configuration.
#[utoipa::path(
    get,
    path = "/config",
    tag = "config",
    operation_id = "getConfig",
    summary = "Get the startup configuration",
    description = "Returns the configuration the process was started with. \
        Configuration is immutable at runtime; change the TOML file and \
        restart the service to apply edits.",
    responses(
        (status = 200, description = "Configuration retrieved", body = ConfigResponse)
    )
)]
pub async fn get_config(State(state): State<SharedState>) -> Json<ConfigResponse> {
    let config = &state.config;
    Json(ConfigResponse {
        serial: SerialConfigResponse {
            port: config.serial.port.clone(),
            baud: config.serial.baud,
        },
        hardware: HardwareConfigResponse {
            button_dump_pin: config.hardware.button_dump_pin,
            button_pair_pin: config.hardware.button_pair_pin,
            led_pin: config.hardware.led_pin,
            led_count: config.hardware.led_count,
            buzzer_pin: config.hardware.buzzer_pin,
        },
        dump_directory: config.dump.directory.display().to_string(),
        silence_threshold_ms: config.dump.silence_threshold_ms,
        read_timeout_secs: config.dump.read_timeout_secs,
        pairing_window_secs: config.pairing.window_secs,
        bridge_tcp_port: config.bridge.tcp_port,
        cloud_sync_enabled: config.cloud.enabled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_response_serialization() {
        let response = ConfigResponse {
            serial: SerialConfigResponse {
                port: "/dev/ttyACM0".to_string(),
                baud: 115_200,
            },
            hardware: HardwareConfigResponse {
                button_dump_pin: 23,
                button_pair_pin: 24,
                led_pin: 18,
                led_count: 4,
                buzzer_pin: 25,
            },
            dump_directory: "/var/lib/skyhook/dumps".to_string(),
            silence_threshold_ms: 500,
            read_timeout_secs: 10,
            pairing_window_secs: 30,
            bridge_tcp_port: 5000,
            cloud_sync_enabled: false,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("/dev/ttyACM0"));
        assert!(json.contains("\"bridge_tcp_port\":5000"));
    }
}
