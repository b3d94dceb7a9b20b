//! Exclusive operating mode and the controller that owns it.
//!
//! Every worker in the system shares a single [`ModeController`]. All reads
//! and writes of the mode and of the shared connection/button state go
//! through it, so the invariant "at most one of DUMPING/PAIRING is active at
//! any instant" holds by construction: [`ModeController::try_enter`] is the
//! only way into an exclusive mode and only one concurrent caller can win.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dumps::DumpRecord;
use crate::error::{Result, SkyhookError};

/// The single exclusive operating mode.
///
/// `Dumping` and `Pairing` never transition into each other directly; both
/// must pass through `Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// No exclusive operation is running; the bridge may be up.
    #[default]
    Idle,
    /// The extraction worker owns the serial device.
    Dumping,
    /// The pairing supervisor owns the radio.
    Pairing,
}

impl Mode {
    /// Returns `true` when no exclusive operation is running.
    #[inline]
    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "IDLE",
            Self::Dumping => "DUMPING",
            Self::Pairing => "PAIRING",
        };
        f.write_str(s)
    }
}

/// Presence and identity of the target serial device.
///
/// Updated solely by the device monitor; everyone else reads it through
/// [`ModeController::snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConnectionState {
    /// Whether a device is currently attached.
    pub present: bool,
    /// Serial device path, e.g. `/dev/ttyACM0`.
    pub path: String,
    /// Baud rate the device is expected to speak.
    pub baud: u32,
    /// Human-readable descriptor of the detected device, when known.
    pub description: Option<String>,
}

impl ConnectionState {
    /// State for a device that has not been seen yet on the configured port.
    #[must_use]
    pub const fn absent(path: String, baud: u32) -> Self {
        Self {
            present: false,
            path,
            baud,
            description: None,
        }
    }
}

/// Debounced button levels, published by the button monitor for status
/// reporting. `true` means pressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ButtonSnapshot {
    /// Dump trigger button.
    pub dump: bool,
    /// Pairing trigger button.
    pub pair: bool,
}

/// A consistent view of the shared state for status reporting.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    /// Current exclusive mode.
    pub mode: Mode,
    /// Device presence and identity.
    pub connection: ConnectionState,
    /// Debounced button levels.
    pub buttons: ButtonSnapshot,
    /// Most recent successful extraction, if any.
    pub last_dump: Option<DumpRecord>,
    /// Outcome message of the most recent failed extraction, if any.
    pub last_dump_error: Option<String>,
}

#[derive(Debug)]
struct ControllerState {
    mode: Mode,
    connection: ConnectionState,
    buttons: ButtonSnapshot,
    last_dump: Option<DumpRecord>,
    last_dump_error: Option<String>,
}

/// Single-owner exclusive-state object injected into every worker.
///
/// The critical sections are a handful of field reads/writes, so a plain
/// [`std::sync::Mutex`] is the synchronization point; readers never hold it
/// across I/O.
#[derive(Debug)]
pub struct ModeController {
    state: Mutex<ControllerState>,
}

impl ModeController {
    /// Create a controller with an initial connection state built from
    /// configuration (device not yet seen).
    #[must_use]
    pub fn new(initial_connection: ConnectionState) -> Self {
        Self {
            state: Mutex::new(ControllerState {
                mode: Mode::Idle,
                connection: initial_connection,
                buttons: ButtonSnapshot::default(),
                last_dump: None,
                last_dump_error: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Atomically enter an exclusive mode.
    ///
    /// `target` must be [`Mode::Dumping`] or [`Mode::Pairing`]. Succeeds only
    /// when the current mode is `Idle`; under concurrent callers exactly one
    /// wins and the rest receive [`SkyhookError::Busy`] without side effects.
    ///
    /// # Errors
    ///
    /// Returns [`SkyhookError::Busy`] carrying the mode that was active.
    pub fn try_enter(&self, target: Mode) -> Result<()> {
        let mut state = self.lock();
        if state.mode.is_idle() && !target.is_idle() {
            state.mode = target;
            Ok(())
        } else {
            Err(SkyhookError::Busy { mode: state.mode })
        }
    }

    /// Return to `Idle`. Always safe to call, whatever the outcome of the
    /// operation that held the mode.
    pub fn leave(&self) {
        self.lock().mode = Mode::Idle;
    }

    /// Current mode without the rest of the snapshot.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.lock().mode
    }

    /// A consistent read of mode, connection, buttons, and the latest
    /// extraction outcome.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        let state = self.lock();
        StatusSnapshot {
            mode: state.mode,
            connection: state.connection.clone(),
            buttons: state.buttons,
            last_dump: state.last_dump.clone(),
            last_dump_error: state.last_dump_error.clone(),
        }
    }

    /// Replace the connection state. Called by the device monitor only.
    pub fn update_connection(&self, connection: ConnectionState) {
        self.lock().connection = connection;
    }

    /// Publish debounced button levels. Called by the button monitor only.
    pub fn update_buttons(&self, buttons: ButtonSnapshot) {
        self.lock().buttons = buttons;
    }

    /// Record the outcome of an extraction so status reporting can surface
    /// it. A success clears any prior failure message.
    pub fn record_dump_outcome(&self, outcome: std::result::Result<DumpRecord, String>) {
        let mut state = self.lock();
        match outcome {
            Ok(record) => {
                state.last_dump = Some(record);
                state.last_dump_error = None;
            }
            Err(message) => state.last_dump_error = Some(message),
        }
    }
}
