//! Action trigger API endpoints.
//!
//! Triggers behave exactly like the physical buttons: the exclusive mode is
//! won or lost synchronously and the response returns immediately; the
//! operation itself runs on its own task. A request while another operation
//! holds the mode gets a 409 carrying the current mode.

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::{ApiError, ApiResult};
use crate::state::SharedState;

/// Creates the actions router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/{action}", post(trigger_action))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Actions that can be triggered remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TriggerAction {
    /// Start a configuration extraction.
    Dump,
    /// Open a radio pairing window.
    Pair,
}

/// Trigger accepted response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "accepted": true,
    "mode": "DUMPING"
}))]
pub struct TriggerResponse {
    /// Whether the trigger won the exclusive mode.
    #[schema(example = true)]
    pub accepted: bool,

    /// The mode the system entered.
    #[schema(example = "DUMPING")]
    pub mode: String,
}

// ============================================================================
// Handler
// ============================================================================

/// Trigger an action.
#[utoipa::path(
    post,
    path = "/action/{action}",
    tag = "actions",
    operation_id = "triggerAction",
    summary = "Trigger a dump or pairing window",
    description = "Starts the requested exclusive operation and returns \
        immediately; the operation's outcome is reported via /status. A dump \
        additionally requires the device to be attached.",
    params(
        ("action" = String, Path, description = "`dump` or `pair`")
    ),
    responses(
        (status = 202, description = "Trigger accepted", body = TriggerResponse),
        (status = 400, description = "Unknown action"),
        (status = 409, description = "Another exclusive operation is running"),
        (status = 424, description = "Device not attached (dump only)")
    )
)]
pub async fn trigger_action(
    State(state): State<SharedState>,
    Path(action): Path<String>,
) -> ApiResult<(axum::http::StatusCode, Json<TriggerResponse>)> {
    let action: TriggerAction =
        serde_json::from_value(serde_json::Value::String(action.clone())).map_err(|_| {
            ApiError::BadRequest {
                error_code: "UNKNOWN_ACTION".to_string(),
                message: format!("unknown action {action:?}, expected \"dump\" or \"pair\""),
            }
        })?;

    let (result, mode) = match action {
        TriggerAction::Dump => (state.orchestrator.trigger_dump(), "DUMPING"),
        TriggerAction::Pair => (state.orchestrator.trigger_pair(), "PAIRING"),
    };
    result?;

    Ok((
        axum::http::StatusCode::ACCEPTED,
        Json(TriggerResponse {
            accepted: true,
            mode: mode.to_string(),
        }),
    ))
}
