//! The serial-to-network bridge supervisor.
//!
//! While the system is idle and a device is attached, an external `socat`
//! process relays bytes between the serial device and a TCP port so desktop
//! configurators can reach the device over the network. The bridge must be
//! down whenever an exclusive operation owns the serial device, so the
//! supervisor's loop derives the desired process state from the current
//! mode, lagging it by at most one poll interval. A bridge that dies on its
//! own while idle is restarted on the next tick.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{Result, SkyhookError};
use crate::mode::ModeController;

/// Lifecycle of the external bridge process, injected so tests never spawn
/// a real one.
pub trait BridgeControl: Send {
    /// Start a bridge bound to the serial device and TCP port.
    ///
    /// # Errors
    ///
    /// Returns [`SkyhookError::Process`] when the process cannot be spawned.
    fn spawn(&mut self, serial_path: &str, baud: u32, tcp_port: u16) -> Result<()>;

    /// Whether the process is currently running.
    fn is_alive(&mut self) -> bool;

    /// Ask the process to exit gracefully.
    ///
    /// # Errors
    ///
    /// Returns [`SkyhookError::Process`] when the signal cannot be sent.
    fn signal_terminate(&mut self) -> Result<()>;

    /// Kill the process outright.
    fn force_kill(&mut self);

    /// Forget the handle after the process is gone.
    fn clear(&mut self);
}

/// `socat`-backed bridge: `TCP-LISTEN ↔ serial device file`.
#[derive(Debug, Default)]
pub struct SocatBridge {
    child: Option<Child>,
}

impl BridgeControl for SocatBridge {
    fn spawn(&mut self, serial_path: &str, baud: u32, tcp_port: u16) -> Result<()> {
        let child = Command::new("socat")
            .arg(format!("TCP-LISTEN:{tcp_port},fork,reuseaddr"))
            .arg(format!("FILE:{serial_path},b{baud},raw,echo=0"))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SkyhookError::Process(format!("spawn socat: {e}")))?;
        self.child = Some(child);
        Ok(())
    }

    fn is_alive(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    fn signal_terminate(&mut self) -> Result<()> {
        let pid = self
            .child
            .as_ref()
            .and_then(Child::id)
            .ok_or_else(|| SkyhookError::Process("no bridge process to signal".to_string()))?;
        #[allow(clippy::cast_possible_wrap)]
        let pid = Pid::from_raw(pid as i32);
        kill(pid, Signal::SIGTERM)
            .map_err(|e| SkyhookError::Process(format!("SIGTERM socat: {e}")))
    }

    fn force_kill(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "could not kill bridge process");
            }
            // Reap if it is already gone.
            let _ = child.try_wait();
        }
    }

    fn clear(&mut self) {
        self.child = None;
    }
}

/// Keeps the bridge process state tracking the exclusive mode.
pub struct BridgeSupervisor<B: BridgeControl> {
    controller: Arc<ModeController>,
    bridge: B,
    tcp_port: u16,
    poll: Duration,
    stop_grace: Duration,
    /// Path the live bridge was bound to, so a device path change while
    /// idle recycles the process.
    bound_path: Option<String>,
}

impl<B: BridgeControl> BridgeSupervisor<B> {
    /// Build a supervisor over the injected process capability.
    #[must_use]
    pub fn new(
        controller: Arc<ModeController>,
        bridge: B,
        tcp_port: u16,
        poll: Duration,
        stop_grace: Duration,
    ) -> Self {
        Self {
            controller,
            bridge,
            tcp_port,
            poll,
            stop_grace,
            bound_path: None,
        }
    }

    /// Run until the shutdown channel flips, then stop any live bridge
    /// within the bounded grace period.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.poll);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            tcp_port = self.tcp_port,
            poll_ms = self.poll.as_millis() as u64,
            "bridge supervisor started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => self.tick().await,
                _ = shutdown.changed() => break,
            }
        }

        if self.bridge.is_alive() {
            info!("stopping bridge for shutdown");
            self.stop().await;
        }
        debug!("bridge supervisor stopped");
    }

    async fn tick(&mut self) {
        let snapshot = self.controller.snapshot();

        if snapshot.mode.is_idle() {
            let alive = self.bridge.is_alive();
            let path_changed = alive
                && self.bound_path.as_deref() != Some(snapshot.connection.path.as_str());

            if path_changed {
                info!(path = %snapshot.connection.path, "device path changed, recycling bridge");
                self.stop().await;
            } else if alive {
                return;
            }

            if snapshot.connection.present {
                match self.bridge.spawn(
                    &snapshot.connection.path,
                    snapshot.connection.baud,
                    self.tcp_port,
                ) {
                    Ok(()) => {
                        self.bound_path = Some(snapshot.connection.path.clone());
                        info!(
                            path = %snapshot.connection.path,
                            tcp_port = self.tcp_port,
                            "bridge started"
                        );
                    }
                    // Retried on the next tick.
                    Err(e) => warn!(error = %e, "bridge start failed"),
                }
            }
        } else if self.bridge.is_alive() {
            info!(mode = %snapshot.mode, "stopping bridge for exclusive operation");
            self.stop().await;
        }
    }

    /// SIGTERM, wait up to the grace period, SIGKILL if still alive. Never
    /// leaves an orphan behind.
    async fn stop(&mut self) {
        if !self.bridge.is_alive() {
            self.bridge.clear();
            return;
        }
        if let Err(e) = self.bridge.signal_terminate() {
            warn!(error = %e, "bridge terminate signal failed");
        }

        let deadline = Instant::now() + self.stop_grace;
        while Instant::now() < deadline {
            if !self.bridge.is_alive() {
                self.bridge.clear();
                debug!("bridge exited gracefully");
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        warn!("bridge did not exit within grace period, killing");
        self.bridge.force_kill();
        self.bridge.clear();
    }
}
