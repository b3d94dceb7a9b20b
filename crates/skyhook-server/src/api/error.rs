//! API error types and response handling.
//!
//! This module provides a unified error type for all API handlers
//! with automatic conversion to appropriate HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use skyhook_core::{Mode, SkyhookError};

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type.
///
/// Each variant maps to a specific HTTP status code and produces a
/// consistent JSON error response.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 400 Bad Request - Invalid input from client.
    BadRequest {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 404 Not Found - Resource does not exist.
    NotFound {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 409 Conflict - An exclusive operation currently holds the mode.
    Busy {
        /// Human-readable error message.
        message: String,
        /// The mode that was active when the request was rejected.
        mode: Mode,
    },

    /// 424 Failed Dependency - The target device is not attached.
    FailedDependency {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 500 Internal Server Error - Unexpected server-side error.
    InternalError {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Optional details (not exposed to client in production).
        details: Option<String>,
    },

    /// 502 Bad Gateway - The device answered with garbage or not at all.
    ProtocolError {
        /// Human-readable error message.
        message: String,
    },

    /// 503 Service Unavailable - Process or hardware layer is unavailable.
    ServiceUnavailable {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "SYSTEM_BUSY",
    "message": "system is busy: current mode is PAIRING",
    "details": {"mode": "PAIRING"}
}))]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "SYSTEM_BUSY").
    #[schema(example = "SYSTEM_BUSY")]
    pub error: String,

    /// Human-readable error message.
    #[schema(example = "system is busy: current mode is PAIRING")]
    pub message: String,

    /// Optional additional details for debugging.
    #[schema(nullable)]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            Self::BadRequest { error_code, message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::NotFound { error_code, message } => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::Busy { message, mode } => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: "SYSTEM_BUSY".to_string(),
                    message,
                    details: Some(serde_json::json!({ "mode": mode })),
                },
            ),

            Self::FailedDependency { error_code, message } => (
                StatusCode::from_u16(424).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::InternalError {
                error_code,
                message,
                details,
            } => {
                // Log internal errors
                tracing::error!(
                    error_code = %error_code,
                    message = %message,
                    details = ?details,
                    "Internal server error"
                );

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: error_code,
                        message,
                        details: details.map(|d| serde_json::json!(d)),
                    },
                )
            }

            Self::ProtocolError { message } => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse {
                    error: "PROTOCOL_ERROR".to_string(),
                    message,
                    details: None,
                },
            ),

            Self::ServiceUnavailable { error_code, message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest { message, .. } => write!(f, "Bad Request: {message}"),
            Self::NotFound { message, .. } => write!(f, "Not Found: {message}"),
            Self::Busy { message, .. } => write!(f, "Conflict: {message}"),
            Self::FailedDependency { message, .. } => {
                write!(f, "Failed Dependency: {message}")
            }
            Self::InternalError { message, .. } => {
                write!(f, "Internal Error: {message}")
            }
            Self::ProtocolError { message } => write!(f, "Protocol Error: {message}"),
            Self::ServiceUnavailable { message, .. } => {
                write!(f, "Service Unavailable: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Convert from skyhook_core errors.
impl From<SkyhookError> for ApiError {
    fn from(err: SkyhookError) -> Self {
        match &err {
            SkyhookError::Busy { mode } => Self::Busy {
                message: err.to_string(),
                mode: *mode,
            },
            SkyhookError::Connection(_) => Self::FailedDependency {
                error_code: err.error_code().to_string(),
                message: err.to_string(),
            },
            SkyhookError::Protocol(_) => Self::ProtocolError {
                message: err.to_string(),
            },
            SkyhookError::InvalidFilename(_) => Self::BadRequest {
                error_code: err.error_code().to_string(),
                message: err.to_string(),
            },
            SkyhookError::Process(_) | SkyhookError::Permission(_) => Self::ServiceUnavailable {
                error_code: err.error_code().to_string(),
                message: err.to_string(),
            },
            SkyhookError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => Self::NotFound {
                error_code: "DUMP_NOT_FOUND".to_string(),
                message: err.to_string(),
            },
            SkyhookError::ConfigNotFound(_)
            | SkyhookError::ConfigParse(_)
            | SkyhookError::ConfigValidation { .. }
            | SkyhookError::Persistence(_)
            | SkyhookError::Io(_) => Self::InternalError {
                error_code: err.error_code().to_string(),
                message: err.to_string(),
                details: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_error_carries_mode() {
        let err = ApiError::from(SkyhookError::Busy { mode: Mode::Pairing });
        match err {
            ApiError::Busy { mode, .. } => assert_eq!(mode, Mode::Pairing),
            other => panic!("expected Busy, got {other}"),
        }
    }

    #[test]
    fn test_connection_error_maps_to_failed_dependency() {
        let err = ApiError::from(SkyhookError::Connection("no device".into()));
        assert!(matches!(err, ApiError::FailedDependency { .. }));
    }

    #[test]
    fn test_missing_file_maps_to_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ApiError::from(SkyhookError::Io(io));
        assert!(matches!(err, ApiError::NotFound { .. }));
    }

    #[test]
    fn test_invalid_filename_maps_to_bad_request() {
        let err = ApiError::from(SkyhookError::InvalidFilename("../x".into()));
        assert!(matches!(err, ApiError::BadRequest { .. }));
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse {
            error: "SYSTEM_BUSY".to_string(),
            message: "Test message".to_string(),
            details: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("SYSTEM_BUSY"));
    }
}
