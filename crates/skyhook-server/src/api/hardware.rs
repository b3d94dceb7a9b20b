//! Hardware pass-through test API endpoint.
//!
//! Direct LED/buzzer control for field diagnostics. The orchestration core
//! does not depend on this; requests go straight to the injected indicator
//! capability, which owns the actual pattern rendering.

use axum::extract::{Path, Query, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use skyhook_core::TestComponent;

use crate::api::error::{ApiError, ApiResult};
use crate::state::SharedState;

/// Creates the hardware test router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/hardware/{component}", post(test_hardware))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Hardware test parameters.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TestParams {
    /// Action to apply, e.g. `on`, `off`, `red`, `green`.
    #[param(example = "on")]
    pub action: Option<String>,
}

/// Hardware test response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "component": "led",
    "action": "red",
    "status": "applied"
}))]
pub struct HardwareTestResponse {
    /// Component that was exercised.
    #[schema(example = "led")]
    pub component: String,

    /// Action that was applied.
    #[schema(example = "red")]
    pub action: String,

    /// Outcome.
    #[schema(example = "applied")]
    pub status: String,
}

// ============================================================================
// Handler
// ============================================================================

/// Exercise an indicator component.
#[utoipa::path(
    post,
    path = "/test/hardware/{component}",
    tag = "hardware",
    operation_id = "testHardware",
    summary = "Exercise the LED strip or buzzer",
    description = "Passes the action straight through to the indicator \
        capability for field diagnostics.",
    params(
        ("component" = String, Path, description = "`led` or `buzzer`"),
        TestParams
    ),
    responses(
        (status = 200, description = "Action applied", body = HardwareTestResponse),
        (status = 400, description = "Unknown component"),
        (status = 503, description = "Indicator backend unavailable")
    )
)]
pub async fn test_hardware(
    State(state): State<SharedState>,
    Path(component): Path<String>,
    Query(params): Query<TestParams>,
) -> ApiResult<Json<HardwareTestResponse>> {
    let parsed: TestComponent = serde_json::from_value(serde_json::Value::String(
        component.clone(),
    ))
    .map_err(|_| ApiError::BadRequest {
        error_code: "UNKNOWN_COMPONENT".to_string(),
        message: format!("unknown component {component:?}, expected \"led\" or \"buzzer\""),
    })?;

    let action = params.action.unwrap_or_else(|| "on".to_string());
    match parsed {
        TestComponent::Led => state.indicators.led(&action)?,
        TestComponent::Buzzer => state.indicators.buzzer(&action)?,
    }

    Ok(Json(HardwareTestResponse {
        component,
        action,
        status: "applied".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardware_response_serialization() {
        let response = HardwareTestResponse {
            component: "led".to_string(),
            action: "red".to_string(),
            status: "applied".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"component\":\"led\""));
    }
}
