//! # skyhook-core
//!
//! Core orchestration logic for skyhook, the field recovery tool that pulls
//! configuration dumps off crashed flight controllers.
//!
//! This crate provides:
//! - The exclusive operating mode and its race-free controller
//! - Always-on monitors for device presence and physical buttons
//! - Supervision of the external serial-to-TCP bridge process
//! - The timed radio pairing window
//! - The blocking serial extraction protocol with silence-based termination
//! - Dump artifact storage and firmware identity detection
//!
//! ## Architecture
//!
//! One [`mode::ModeController`] is shared by every worker; all mode and
//! connection-state access goes through it. Hardware, serial, radio, cloud,
//! and bridge-process access are injected capability traits so the core runs
//! and tests on any platform:
//!
//! - [`mode`] - Exclusive mode, connection state, status snapshots
//! - [`device`] - Serial bus polling and candidate ranking
//! - [`buttons`] - Debounced physical button monitoring
//! - [`bridge`] - Bridge process supervision (socat)
//! - [`pairing`] - Timed radio discoverability window (BlueZ)
//! - [`extraction`] - The serial dump protocol
//! - [`orchestrator`] - Trigger hand-off into the exclusive workers
//! - [`dumps`] - Dump artifact storage
//! - [`identify`] - Firmware identity detection
//! - [`hardware`] - GPIO and indicator capability interfaces
//! - [`config`] - Application configuration loading and validation
//! - [`error`] - Unified error types for the crate

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod bridge;
pub mod buttons;
pub mod config;
pub mod device;
pub mod dumps;
pub mod error;
pub mod extraction;
pub mod hardware;
pub mod identify;
pub mod mode;
pub mod orchestrator;
pub mod pairing;

// Re-export primary types for convenience
pub use bridge::{BridgeControl, BridgeSupervisor, SocatBridge};
pub use buttons::{ButtonMonitor, Debouncer, Edge};
pub use config::SkyhookConfig;
pub use device::{DeviceMonitor, PortCandidate};
pub use dumps::{DumpRecord, DumpStore};
pub use error::{Result, SkyhookError};
pub use extraction::{
    CloudSync, ExtractionWorker, NoCloudSync, RcloneSync, SerialConnection, SerialOpener,
    SystemSerialOpener,
};
pub use hardware::{
    ButtonInput, ButtonLevels, FixedButtonInput, IndicatorHardware, NullIndicators, SysfsButtonInput,
    TestComponent,
};
pub use mode::{ButtonSnapshot, ConnectionState, Mode, ModeController, StatusSnapshot};
pub use orchestrator::{Orchestrator, WorkerTimings};
#[cfg(feature = "bluetooth")]
pub use pairing::BluerRadio;
pub use pairing::{PairingSupervisor, RadioControl, UnavailableRadio};
