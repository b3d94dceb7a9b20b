//! Application state shared across handlers.

use std::sync::Arc;

use skyhook_core::{DumpStore, IndicatorHardware, ModeController, Orchestrator, SkyhookConfig};

/// Shared application state. Cheap to clone; everything inside is an `Arc`.
///
/// Configuration is loaded once at startup and immutable afterwards, and the
/// mode controller does its own synchronization, so no outer lock is needed.
#[derive(Clone)]
pub struct AppState {
    /// Startup configuration, immutable for the process lifetime.
    pub config: Arc<SkyhookConfig>,
    /// The single exclusive-mode owner.
    pub controller: Arc<ModeController>,
    /// Trigger dispatch into the exclusive workers.
    pub orchestrator: Arc<Orchestrator>,
    /// Dump artifact storage.
    pub dumps: Arc<DumpStore>,
    /// LED/buzzer pass-through for hardware tests.
    pub indicators: Arc<dyn IndicatorHardware>,
}

/// Alias used by all routers and handlers.
pub type SharedState = AppState;
