//! Dump artifact API endpoints.
//!
//! Lists stored dumps and serves their plain-text content. Filenames are
//! validated against path traversal before the store touches the
//! filesystem.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use skyhook_core::DumpRecord;

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Creates the dumps router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_dumps))
        .route("/{filename}", get(get_dump))
}

// ============================================================================
// Response Types
// ============================================================================

/// Dump listing response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "dumps": [{
        "filename": "dump_20250115-093042.txt",
        "created_at": "2025-01-15T09:30:42Z",
        "size_bytes": 48213,
        "firmware": "Betaflight / STM32F405 (S405) 4.4.0"
    }],
    "count": 1
}))]
pub struct DumpListResponse {
    /// Stored dumps, newest first.
    pub dumps: Vec<DumpRecord>,

    /// Number of stored dumps.
    #[schema(example = 1)]
    pub count: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// List stored dumps.
#[utoipa::path(
    get,
    path = "/dumps",
    tag = "dumps",
    operation_id = "listDumps",
    summary = "List stored dumps",
    description = "Returns all stored dump records, newest first.",
    responses(
        (status = 200, description = "Dump list retrieved", body = DumpListResponse),
        (status = 500, description = "Dump directory unreadable")
    )
)]
pub async fn list_dumps(State(state): State<SharedState>) -> ApiResult<Json<DumpListResponse>> {
    let dumps = state.dumps.list()?;
    let count = dumps.len();
    Ok(Json(DumpListResponse { dumps, count }))
}

/// Retrieve one dump's content.
#[utoipa::path(
    get,
    path = "/dumps/{filename}",
    tag = "dumps",
    operation_id = "getDump",
    summary = "Retrieve a dump's content",
    description = "Returns the plain-text capture. Filenames carrying path \
        separators or parent-directory tokens are rejected before any \
        filesystem access.",
    params(
        ("filename" = String, Path, description = "Dump filename, e.g. dump_20250115-093042.txt")
    ),
    responses(
        (status = 200, description = "Dump content", content_type = "text/plain"),
        (status = 400, description = "Invalid filename"),
        (status = 404, description = "No such dump")
    )
)]
pub async fn get_dump(
    State(state): State<SharedState>,
    Path(filename): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let content = state.dumps.read(&filename)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        content,
    ))
}
