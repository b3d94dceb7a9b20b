//! Physical button monitoring.
//!
//! Samples both buttons at a fixed interval through the injected
//! [`ButtonInput`] capability and debounces each: a raw level must hold for
//! the debounce window before the accepted level changes. A qualifying
//! release edge of the dump button triggers an extraction, the pair button
//! a pairing window; a `Busy` answer is dropped silently — edges are not
//! queued. Every iteration is failure-isolated.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::hardware::ButtonInput;
use crate::mode::{ButtonSnapshot, ModeController};
use crate::orchestrator::Orchestrator;

/// An accepted (debounced) level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Released → pressed.
    Pressed,
    /// Pressed → released. This is the edge that triggers actions, so a
    /// held button does nothing until it is let go.
    Released,
}

/// Stable-window debouncer for one button.
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    window: Duration,
    raw: bool,
    accepted: bool,
    raw_since: Instant,
}

impl Debouncer {
    /// Start from a known level.
    #[must_use]
    pub const fn new(initial: bool, window: Duration, now: Instant) -> Self {
        Self {
            window,
            raw: initial,
            accepted: initial,
            raw_since: now,
        }
    }

    /// Feed one sample. Returns the edge once the new level has held for the
    /// whole window.
    pub fn sample(&mut self, level: bool, now: Instant) -> Option<Edge> {
        if level != self.raw {
            self.raw = level;
            self.raw_since = now;
            return None;
        }
        if self.raw != self.accepted && now.duration_since(self.raw_since) >= self.window {
            self.accepted = self.raw;
            return Some(if self.accepted { Edge::Pressed } else { Edge::Released });
        }
        None
    }

    /// The current debounced level.
    #[must_use]
    pub const fn accepted(&self) -> bool {
        self.accepted
    }
}

/// Periodically samples both buttons and fires triggers on release edges.
pub struct ButtonMonitor {
    input: Arc<dyn ButtonInput>,
    controller: Arc<ModeController>,
    orchestrator: Arc<Orchestrator>,
    poll: Duration,
    window: Duration,
}

impl ButtonMonitor {
    /// Build a monitor over the injected input capability.
    #[must_use]
    pub fn new(
        input: Arc<dyn ButtonInput>,
        controller: Arc<ModeController>,
        orchestrator: Arc<Orchestrator>,
        poll: Duration,
        window: Duration,
    ) -> Self {
        Self {
            input,
            controller,
            orchestrator,
            poll,
            window,
        }
    }

    /// Run until the shutdown channel flips.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.poll);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(poll_ms = self.poll.as_millis() as u64, "button monitor started");

        let now = Instant::now();
        let mut dump = Debouncer::new(false, self.window, now);
        let mut pair = Debouncer::new(false, self.window, now);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick(&mut dump, &mut pair) {
                        warn!(error = %e, "button poll failed, skipping iteration");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        debug!("button monitor stopped");
    }

    fn tick(&self, dump: &mut Debouncer, pair: &mut Debouncer) -> Result<()> {
        let levels = self.input.read()?;
        let now = Instant::now();

        if dump.sample(levels.dump, now) == Some(Edge::Released) {
            self.on_dump_released();
        }
        if pair.sample(levels.pair, now) == Some(Edge::Released) {
            self.on_pair_released();
        }

        self.controller.update_buttons(ButtonSnapshot {
            dump: dump.accepted(),
            pair: pair.accepted(),
        });
        Ok(())
    }

    fn on_dump_released(&self) {
        match self.orchestrator.trigger_dump() {
            Ok(()) => info!("dump button accepted"),
            Err(e) if e.is_busy() => debug!("dump button ignored, system busy"),
            Err(e) if e.is_connection_error() => {
                debug!("dump button ignored, no device attached");
            }
            Err(e) => warn!(error = %e, "dump button failed"),
        }
    }

    fn on_pair_released(&self) {
        match self.orchestrator.trigger_pair() {
            Ok(()) => info!("pair button accepted"),
            Err(e) if e.is_busy() => debug!("pair button ignored, system busy"),
            Err(e) => warn!(error = %e, "pair button failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn test_stable_press_and_release_produce_edges() {
        let base = Instant::now();
        let mut d = Debouncer::new(false, Duration::from_millis(30), base);

        assert_eq!(d.sample(true, at(base, 0)), None);
        assert_eq!(d.sample(true, at(base, 10)), None);
        assert_eq!(d.sample(true, at(base, 35)), Some(Edge::Pressed));
        assert!(d.accepted());

        assert_eq!(d.sample(false, at(base, 100)), None);
        assert_eq!(d.sample(false, at(base, 140)), Some(Edge::Released));
        assert!(!d.accepted());
    }

    #[test]
    fn test_glitch_shorter_than_window_is_ignored() {
        let base = Instant::now();
        let mut d = Debouncer::new(false, Duration::from_millis(30), base);

        // Bounce: high for 10 ms, back low before the window elapses.
        assert_eq!(d.sample(true, at(base, 0)), None);
        assert_eq!(d.sample(false, at(base, 10)), None);
        assert_eq!(d.sample(false, at(base, 50)), None);
        assert!(!d.accepted());
    }

    #[test]
    fn test_edge_fires_once_per_change() {
        let base = Instant::now();
        let mut d = Debouncer::new(false, Duration::from_millis(30), base);

        d.sample(true, at(base, 0));
        assert_eq!(d.sample(true, at(base, 40)), Some(Edge::Pressed));
        // Further samples at the same level stay quiet.
        assert_eq!(d.sample(true, at(base, 80)), None);
        assert_eq!(d.sample(true, at(base, 120)), None);
    }

    #[test]
    fn test_bounce_restarts_the_window() {
        let base = Instant::now();
        let mut d = Debouncer::new(false, Duration::from_millis(30), base);

        d.sample(true, at(base, 0));
        // A flicker back to low restarts the clock...
        d.sample(false, at(base, 20));
        d.sample(true, at(base, 25));
        // ...so 30 ms after the original press is not yet stable.
        assert_eq!(d.sample(true, at(base, 35)), None);
        assert_eq!(d.sample(true, at(base, 60)), Some(Edge::Pressed));
    }
}
