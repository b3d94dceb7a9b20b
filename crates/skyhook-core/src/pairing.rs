//! The radio pairing supervisor.
//!
//! Runs only while the exclusive mode is `Pairing`. The workflow is fixed:
//! clear any soft radio block, power the adapter on, open a discoverable
//! window, hold it for the configured duration, close it, and return the
//! mode to `Idle`. The window blocks only this supervisor's own task; the
//! monitors keep polling and simply observe a non-idle mode. There is no
//! cancellation path — the window always runs to completion.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{info, warn};

use crate::error::{Result, SkyhookError};
use crate::mode::ModeController;

/// Control over the radio interface, injected so tests run without BlueZ.
pub trait RadioControl: Send + Sync {
    /// Lift any soft rfkill block on the radio. Best-effort.
    fn clear_soft_block(&self) -> BoxFuture<'_, Result<()>>;

    /// Power the adapter on.
    fn power_on(&self) -> BoxFuture<'_, Result<()>>;

    /// Make the adapter discoverable and pairable, or end that state.
    fn set_discoverable(&self, on: bool) -> BoxFuture<'_, Result<()>>;
}

/// Executes one timed discoverability window and always returns the mode to
/// `Idle` when done.
pub struct PairingSupervisor {
    controller: Arc<ModeController>,
    radio: Arc<dyn RadioControl>,
    window: Duration,
}

impl PairingSupervisor {
    /// Build a supervisor over the injected radio capability.
    #[must_use]
    pub fn new(controller: Arc<ModeController>, radio: Arc<dyn RadioControl>, window: Duration) -> Self {
        Self {
            controller,
            radio,
            window,
        }
    }

    /// Run the pairing workflow to completion. The caller must already hold
    /// the `Pairing` mode; this method releases it exactly once.
    pub async fn run(self) {
        if let Err(e) = self.execute().await {
            warn!(error = %e, "pairing window aborted");
        }
        self.controller.leave();
    }

    async fn execute(&self) -> Result<()> {
        // rfkill may be absent or already clear; either way pairing proceeds.
        if let Err(e) = self.radio.clear_soft_block().await {
            warn!(error = %e, "could not clear radio soft block");
        }

        self.radio.power_on().await?;
        self.radio.set_discoverable(true).await?;
        info!(window_secs = self.window.as_secs(), "radio discoverable");

        tokio::time::sleep(self.window).await;

        if let Err(e) = self.radio.set_discoverable(false).await {
            warn!(error = %e, "could not end discoverable window");
        }
        info!("discoverable window closed");
        Ok(())
    }
}

// ============================================================================
// bluer-backed radio
// ============================================================================

/// BlueZ adapter control via `bluer`.
#[cfg(feature = "bluetooth")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BluerRadio;

#[cfg(feature = "bluetooth")]
impl BluerRadio {
    async fn adapter() -> Result<bluer::Adapter> {
        let session = bluer::Session::new().await.map_err(radio_error)?;
        session.default_adapter().await.map_err(radio_error)
    }
}

#[cfg(feature = "bluetooth")]
fn radio_error(e: bluer::Error) -> SkyhookError {
    SkyhookError::Permission(format!("bluetooth adapter: {e}"))
}

#[cfg(feature = "bluetooth")]
impl RadioControl for BluerRadio {
    fn clear_soft_block(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async {
            let status = tokio::process::Command::new("rfkill")
                .args(["unblock", "bluetooth"])
                .status()
                .await
                .map_err(|e| SkyhookError::Process(format!("rfkill: {e}")))?;
            if status.success() {
                Ok(())
            } else {
                Err(SkyhookError::Process(format!("rfkill exited with {status}")))
            }
        })
    }

    fn power_on(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async {
            let adapter = Self::adapter().await?;
            adapter.set_powered(true).await.map_err(radio_error)
        })
    }

    fn set_discoverable(&self, on: bool) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let adapter = Self::adapter().await?;
            adapter.set_pairable(on).await.map_err(radio_error)?;
            adapter.set_discoverable(on).await.map_err(radio_error)
        })
    }
}

/// Radio stub for builds without Bluetooth support. Every operation fails,
/// so a pairing trigger ends the window immediately and releases the mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableRadio;

impl RadioControl for UnavailableRadio {
    fn clear_soft_block(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn power_on(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async {
            Err(SkyhookError::Permission(
                "bluetooth support not available in this build".to_string(),
            ))
        })
    }

    fn set_discoverable(&self, _on: bool) -> BoxFuture<'_, Result<()>> {
        Box::pin(async {
            Err(SkyhookError::Permission(
                "bluetooth support not available in this build".to_string(),
            ))
        })
    }
}
