//! Trigger hand-off between trigger sources and the exclusive workers.
//!
//! Both trigger sources — the physical buttons and the HTTP action endpoint
//! — go through the same two calls here. A trigger wins or loses the
//! exclusive mode synchronously; the workflow itself then runs on its own
//! task and the caller gets its answer immediately.

use std::sync::Arc;

use tracing::info;

use crate::dumps::DumpStore;
use crate::error::{Result, SkyhookError};
use crate::extraction::{CloudSync, ExtractionWorker, SerialOpener};
use crate::mode::{Mode, ModeController};
use crate::pairing::{PairingSupervisor, RadioControl};

/// Timing knobs the workers need, split from the full configuration so the
/// orchestrator does not drag the whole config around.
#[derive(Debug, Clone, Copy)]
pub struct WorkerTimings {
    /// Capture ends once the device is quiet this long.
    pub silence_threshold: std::time::Duration,
    /// Absolute ceiling on a capture session.
    pub read_timeout: std::time::Duration,
    /// Radio discoverability window.
    pub pairing_window: std::time::Duration,
}

/// Dispatches triggers into the exclusive workers.
pub struct Orchestrator {
    controller: Arc<ModeController>,
    serial: Arc<dyn SerialOpener>,
    radio: Arc<dyn RadioControl>,
    cloud: Arc<dyn CloudSync>,
    dumps: Arc<DumpStore>,
    timings: WorkerTimings,
}

impl Orchestrator {
    /// Build an orchestrator over the injected capabilities.
    #[must_use]
    pub fn new(
        controller: Arc<ModeController>,
        serial: Arc<dyn SerialOpener>,
        radio: Arc<dyn RadioControl>,
        cloud: Arc<dyn CloudSync>,
        dumps: Arc<DumpStore>,
        timings: WorkerTimings,
    ) -> Self {
        Self {
            controller,
            serial,
            radio,
            cloud,
            dumps,
            timings,
        }
    }

    /// Start an extraction if the device is present and the mode is free.
    ///
    /// Returns as soon as the mode is won; the extraction itself runs on its
    /// own task and releases the mode when done.
    ///
    /// # Errors
    ///
    /// [`SkyhookError::Connection`] when no device is attached,
    /// [`SkyhookError::Busy`] when an exclusive operation is running.
    pub fn trigger_dump(&self) -> Result<()> {
        if !self.controller.snapshot().connection.present {
            return Err(SkyhookError::Connection("no device attached".to_string()));
        }
        self.controller.try_enter(Mode::Dumping)?;
        info!("dump trigger accepted");

        let worker = ExtractionWorker::new(
            Arc::clone(&self.controller),
            Arc::clone(&self.serial),
            Arc::clone(&self.dumps),
            Arc::clone(&self.cloud),
            self.timings.silence_threshold,
            self.timings.read_timeout,
        );
        tokio::spawn(worker.run());
        Ok(())
    }

    /// Open a pairing window if the mode is free.
    ///
    /// Returns as soon as the mode is won; the window runs on its own task
    /// and releases the mode when it closes.
    ///
    /// # Errors
    ///
    /// [`SkyhookError::Busy`] when an exclusive operation is running.
    pub fn trigger_pair(&self) -> Result<()> {
        self.controller.try_enter(Mode::Pairing)?;
        info!("pairing trigger accepted");

        let supervisor = PairingSupervisor::new(
            Arc::clone(&self.controller),
            Arc::clone(&self.radio),
            self.timings.pairing_window,
        );
        tokio::spawn(supervisor.run());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{NoCloudSync, SerialConnection};
    use crate::mode::ConnectionState;
    use crate::pairing::UnavailableRadio;
    use futures::future::BoxFuture;
    use std::time::Duration;

    struct QuietOpener;

    struct QuietConnection;

    impl SerialConnection for QuietConnection {
        fn clear_input(&mut self) -> Result<()> {
            Ok(())
        }
        fn send_line(&mut self, _: &str) -> Result<()> {
            Ok(())
        }
        fn read_chunk(&mut self, _: &mut [u8]) -> Result<usize> {
            std::thread::sleep(Duration::from_millis(2));
            Ok(0)
        }
    }

    impl SerialOpener for QuietOpener {
        fn open(&self, _: &str, _: u32) -> Result<Box<dyn SerialConnection>> {
            Ok(Box::new(QuietConnection))
        }
    }

    struct InstantRadio;

    impl RadioControl for InstantRadio {
        fn clear_soft_block(&self) -> BoxFuture<'_, Result<()>> {
            Box::pin(async { Ok(()) })
        }
        fn power_on(&self) -> BoxFuture<'_, Result<()>> {
            Box::pin(async { Ok(()) })
        }
        fn set_discoverable(&self, _: bool) -> BoxFuture<'_, Result<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn orchestrator(present: bool) -> (Arc<ModeController>, Orchestrator, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let controller = Arc::new(ModeController::new(ConnectionState {
            present,
            path: "/dev/ttyACM0".into(),
            baud: 115_200,
            description: None,
        }));
        let orchestrator = Orchestrator::new(
            Arc::clone(&controller),
            Arc::new(QuietOpener),
            Arc::new(InstantRadio),
            Arc::new(NoCloudSync),
            Arc::new(DumpStore::new(dir.path())),
            WorkerTimings {
                silence_threshold: Duration::from_millis(20),
                read_timeout: Duration::from_millis(200),
                pairing_window: Duration::from_millis(20),
            },
        );
        (controller, orchestrator, dir)
    }

    #[tokio::test]
    async fn test_dump_requires_device() {
        let (_controller, orchestrator, _dir) = orchestrator(false);
        let err = orchestrator.trigger_dump().unwrap_err();
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_dump_trigger_wins_mode_then_releases() {
        let (controller, orchestrator, _dir) = orchestrator(true);
        orchestrator.trigger_dump().unwrap();
        assert_eq!(controller.mode(), Mode::Dumping);

        // The quiet device fails the protocol, but the mode must come back.
        for _ in 0..100 {
            if controller.mode() == Mode::Idle {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(controller.mode(), Mode::Idle);
    }

    #[tokio::test]
    async fn test_second_trigger_is_busy() {
        let (controller, orchestrator, _dir) = orchestrator(true);
        orchestrator.trigger_dump().unwrap();
        let err = orchestrator.trigger_pair().unwrap_err();
        assert!(err.is_busy());
        assert_eq!(controller.mode(), Mode::Dumping);
    }

    #[tokio::test]
    async fn test_pair_trigger_without_device_is_fine() {
        let (controller, orchestrator, _dir) = orchestrator(false);
        orchestrator.trigger_pair().unwrap();
        assert_eq!(controller.mode(), Mode::Pairing);
        for _ in 0..100 {
            if controller.mode() == Mode::Idle {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(controller.mode(), Mode::Idle);
    }

    #[tokio::test]
    async fn test_unavailable_radio_still_releases_mode() {
        let dir = tempfile::tempdir().unwrap();
        let controller = Arc::new(ModeController::new(ConnectionState::absent(
            "/dev/ttyACM0".into(),
            115_200,
        )));
        let orchestrator = Orchestrator::new(
            Arc::clone(&controller),
            Arc::new(QuietOpener),
            Arc::new(UnavailableRadio),
            Arc::new(NoCloudSync),
            Arc::new(DumpStore::new(dir.path())),
            WorkerTimings {
                silence_threshold: Duration::from_millis(20),
                read_timeout: Duration::from_millis(200),
                pairing_window: Duration::from_secs(30),
            },
        );
        orchestrator.trigger_pair().unwrap();
        for _ in 0..100 {
            if controller.mode() == Mode::Idle {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(controller.mode(), Mode::Idle);
    }
}
