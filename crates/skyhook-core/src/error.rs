//! Unified error types for the skyhook core library.
//!
//! This module provides a unified error type [`SkyhookError`] that covers all
//! failure modes across the skyhook system: serial connection problems, the
//! exclusive-mode busy state, extraction protocol failures, bridge process
//! lifecycle failures, and hardware access denials.
//!
//! # Design Principles
//!
//! - **Specific variants**: Each error variant captures exactly one failure mode
//! - **Actionable messages**: Error messages guide users toward resolution
//! - **Never fatal**: No variant terminates a background monitor; each monitor
//!   iteration logs and continues on the next scheduled tick
//! - **HTTP-ready**: Error types include HTTP status codes and error codes

use std::path::PathBuf;
use thiserror::Error;

use crate::mode::Mode;

/// The unified error type for all skyhook operations.
#[derive(Debug, Error)]
pub enum SkyhookError {
    // =========================================================================
    // DEVICE & SERIAL ERRORS
    // =========================================================================
    /// The target device is absent or its serial port could not be opened.
    #[error("serial connection failed: {0}")]
    Connection(String),

    /// An exclusive operation is already in progress.
    #[error("system is busy: current mode is {mode}")]
    Busy {
        /// The mode that was active when the request was rejected.
        mode: Mode,
    },

    /// The device produced no recognizable response to the dump query.
    #[error("extraction protocol failed: {0}")]
    Protocol(String),

    // =========================================================================
    // PROCESS & HARDWARE ERRORS
    // =========================================================================
    /// The bridge process failed to start or would not terminate.
    #[error("bridge process error: {0}")]
    Process(String),

    /// The platform denied access to a hardware resource (GPIO, radio).
    #[error("hardware access denied: {0}")]
    Permission(String),

    // =========================================================================
    // DUMP ARTIFACT ERRORS
    // =========================================================================
    /// A requested dump filename contains a path separator or parent token.
    #[error("invalid dump filename: {0:?}")]
    InvalidFilename(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(String),

    /// The configuration was parsed but contains invalid values.
    #[error("configuration validation failed: {field}: {message}")]
    ConfigValidation {
        /// The offending configuration field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    // =========================================================================
    // PERSISTENCE & I/O ERRORS
    // =========================================================================
    /// An error occurred while persisting or reading data.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for skyhook operations.
pub type Result<T> = std::result::Result<T, SkyhookError>;

impl SkyhookError {
    /// Returns `true` if this error means the exclusive mode was held.
    #[inline]
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }

    /// Returns `true` if this error is related to the serial device.
    #[inline]
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParse(_) | Self::ConfigValidation { .. }
        )
    }

    /// Returns `true` if this error represents an expected operational state
    /// rather than a system failure.
    ///
    /// A rejected trigger while another operation holds the mode is normal
    /// behavior, as is a device that simply did not answer the dump query.
    #[inline]
    #[must_use]
    pub const fn is_expected_state(&self) -> bool {
        matches!(self, Self::Busy { .. } | Self::Protocol(_))
    }

    /// Returns `true` if the next monitor tick is likely to recover from this.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Process(_) | Self::Busy { .. })
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::InvalidFilename(_) => 400,

            // 409 Conflict - an exclusive operation holds the mode
            Self::Busy { .. } => 409,

            // 422 Unprocessable Entity - semantic configuration errors
            Self::ConfigParse(_) | Self::ConfigValidation { .. } => 422,

            // 424 Failed Dependency - the device is not there
            Self::Connection(_) => 424,

            // 500 Internal Server Error - server-side issues
            Self::ConfigNotFound(_) | Self::Persistence(_) | Self::Io(_) => 500,

            // 502 Bad Gateway - the device answered with garbage or not at all
            Self::Protocol(_) => 502,

            // 503 Service Unavailable - process/hardware layer issues
            Self::Process(_) | Self::Permission(_) => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "DEVICE_NOT_CONNECTED",
            Self::Busy { .. } => "SYSTEM_BUSY",
            Self::Protocol(_) => "PROTOCOL_ERROR",
            Self::Process(_) => "PROCESS_ERROR",
            Self::Permission(_) => "PERMISSION_DENIED",
            Self::InvalidFilename(_) => "INVALID_FILENAME",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParse(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidation { .. } => "CONFIG_VALIDATION_ERROR",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoErr, ErrorKind};

    #[test]
    fn test_busy_classification() {
        let err = SkyhookError::Busy { mode: Mode::Dumping };
        assert!(err.is_busy());
        assert!(err.is_expected_state());
        assert!(!err.is_connection_error());
    }

    #[test]
    fn test_connection_error_classification() {
        let err = SkyhookError::Connection("no device".into());
        assert!(err.is_connection_error());
        assert!(err.is_recoverable());
        assert!(!err.is_busy());
    }

    #[test]
    fn test_config_error_classification() {
        assert!(SkyhookError::ConfigNotFound(PathBuf::from("/test")).is_config_error());
        assert!(SkyhookError::ConfigParse("syntax error".into()).is_config_error());
        assert!(SkyhookError::ConfigValidation {
            field: "serial.baud",
            message: "must be non-zero".into()
        }
        .is_config_error());

        assert!(!SkyhookError::Protocol("garbage".into()).is_config_error());
    }

    #[test]
    fn test_protocol_error_is_expected_state() {
        assert!(SkyhookError::Protocol("no response".into()).is_expected_state());
        assert!(!SkyhookError::Permission("gpio".into()).is_expected_state());
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            SkyhookError::InvalidFilename("../x".into()).http_status_code(),
            400
        );
        assert_eq!(
            SkyhookError::Busy { mode: Mode::Pairing }.http_status_code(),
            409
        );
        assert_eq!(
            SkyhookError::Connection("absent".into()).http_status_code(),
            424
        );
        assert_eq!(
            SkyhookError::Protocol("quiet".into()).http_status_code(),
            502
        );
        assert_eq!(
            SkyhookError::Process("socat".into()).http_status_code(),
            503
        );
        assert_eq!(
            SkyhookError::Io(IoErr::new(ErrorKind::Other, "x")).http_status_code(),
            500
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SkyhookError::Busy { mode: Mode::Idle }.error_code(),
            "SYSTEM_BUSY"
        );
        assert_eq!(
            SkyhookError::Connection("x".into()).error_code(),
            "DEVICE_NOT_CONNECTED"
        );
        assert_eq!(
            SkyhookError::InvalidFilename("x".into()).error_code(),
            "INVALID_FILENAME"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoErr::new(ErrorKind::NotFound, "file not found");
        let err: SkyhookError = io_err.into();
        assert!(matches!(err, SkyhookError::Io(_)));
    }

    #[test]
    fn test_error_display_messages() {
        let err = SkyhookError::Busy { mode: Mode::Dumping };
        assert!(format!("{err}").contains("DUMPING"));

        let err = SkyhookError::Connection("/dev/ttyACM0 absent".into());
        assert!(format!("{err}").contains("/dev/ttyACM0"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<SkyhookError>();
        assert_sync::<SkyhookError>();
    }
}
