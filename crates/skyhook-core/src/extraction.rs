//! The serial extraction worker.
//!
//! Runs only while the exclusive mode is `Dumping`, set by whoever won
//! [`ModeController::try_enter`]. The serial session is scoped to a single
//! run: opened at the top, released on every exit path. The read loop uses
//! silence-based termination — capture ends as soon as the device has been
//! quiet for the configured threshold, bounded by an absolute timeout, so a
//! finished dump is detected within the threshold of the last byte instead
//! of after a fixed worst-case delay.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::process::Command;
use tracing::{info, warn};

use crate::dumps::{DumpRecord, DumpStore};
use crate::error::{Result, SkyhookError};
use crate::identify;
use crate::mode::ModeController;

/// How long a single blocking read may wait before the loop re-checks its
/// termination conditions. Bounds the latency of silence detection.
const READ_POLL: Duration = Duration::from_millis(50);

/// The CLI query that makes supported firmware print its whole configuration.
const DUMP_COMMAND: &str = "dump all";

// ============================================================================
// Serial capabilities
// ============================================================================

/// An open serial session, scoped to one extraction.
pub trait SerialConnection: Send {
    /// Discard anything buffered before the session began.
    ///
    /// # Errors
    ///
    /// Returns [`SkyhookError::Connection`] when the port rejects the flush.
    fn clear_input(&mut self) -> Result<()>;

    /// Send one CRLF-terminated command line.
    ///
    /// # Errors
    ///
    /// Returns [`SkyhookError::Connection`] when the write fails.
    fn send_line(&mut self, command: &str) -> Result<()>;

    /// Read whatever is available, blocking at most a short poll interval.
    /// Returns `Ok(0)` when the interval elapsed with nothing to read.
    ///
    /// # Errors
    ///
    /// Returns [`SkyhookError::Connection`] when the port fails mid-session.
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Opens serial sessions. Injected so tests can substitute a scripted fake.
pub trait SerialOpener: Send + Sync {
    /// Open the device at `path`/`baud`.
    ///
    /// # Errors
    ///
    /// Returns [`SkyhookError::Connection`] when the device is absent or the
    /// open fails.
    fn open(&self, path: &str, baud: u32) -> Result<Box<dyn SerialConnection>>;
}

/// The real `serialport`-backed opener.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSerialOpener;

struct SystemSerialConnection {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialOpener for SystemSerialOpener {
    fn open(&self, path: &str, baud: u32) -> Result<Box<dyn SerialConnection>> {
        let port = serialport::new(path, baud)
            .timeout(READ_POLL)
            .open()
            .map_err(|e| SkyhookError::Connection(format!("{path}: {e}")))?;
        Ok(Box::new(SystemSerialConnection { port }))
    }
}

impl SerialConnection for SystemSerialConnection {
    fn clear_input(&mut self) -> Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|e| SkyhookError::Connection(format!("clear input: {e}")))
    }

    fn send_line(&mut self, command: &str) -> Result<()> {
        self.port
            .write_all(format!("{command}\r\n").as_bytes())
            .and_then(|()| self.port.flush())
            .map_err(|e| SkyhookError::Connection(format!("write {command:?}: {e}")))
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(SkyhookError::Connection(format!("read: {e}"))),
        }
    }
}

// ============================================================================
// Cloud sync hand-off
// ============================================================================

/// External cloud-sync collaborator. The worker only signals it; upload
/// success is the collaborator's business.
pub trait CloudSync: Send + Sync {
    /// Hand a freshly written dump file off for upload. Fire-and-forget.
    fn schedule_upload(&self, file: &Path);
}

/// rclone-backed hand-off: spawns `rclone copy <file> <remote>` and walks
/// away. Requires a tokio runtime context.
#[derive(Debug, Clone)]
pub struct RcloneSync {
    remote: String,
}

impl RcloneSync {
    /// Hand-off targeting the given rclone remote, e.g. `gdrive:dumps`.
    #[must_use]
    pub fn new(remote: impl Into<String>) -> Self {
        Self { remote: remote.into() }
    }
}

impl CloudSync for RcloneSync {
    fn schedule_upload(&self, file: &Path) {
        let remote = self.remote.clone();
        let file = file.to_path_buf();
        tokio::spawn(async move {
            match Command::new("rclone")
                .arg("copy")
                .arg(&file)
                .arg(&remote)
                .status()
                .await
            {
                Ok(status) if status.success() => {
                    info!(file = %file.display(), remote = %remote, "cloud sync finished");
                }
                Ok(status) => {
                    warn!(file = %file.display(), %status, "cloud sync exited with failure");
                }
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "cloud sync could not start");
                }
            }
        });
    }
}

/// Hand-off that drops the request. Used when cloud sync is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCloudSync;

impl CloudSync for NoCloudSync {
    fn schedule_upload(&self, _file: &Path) {}
}

// ============================================================================
// Read loop
// ============================================================================

/// Capture bytes until the device goes quiet.
///
/// Continues while the time since the most recent byte is below `silence`
/// AND the total elapsed time is below `overall`. The port's short read
/// timeout bounds how far past the silence threshold the loop can run.
///
/// # Errors
///
/// Propagates [`SkyhookError::Connection`] from mid-session read failures.
pub fn read_until_quiet(
    port: &mut dyn SerialConnection,
    silence: Duration,
    overall: Duration,
) -> Result<Vec<u8>> {
    let started = Instant::now();
    let mut last_byte = started;
    let mut captured = Vec::new();
    let mut buf = [0u8; 512];

    loop {
        if last_byte.elapsed() >= silence || started.elapsed() >= overall {
            break;
        }
        let n = port.read_chunk(&mut buf)?;
        if n > 0 {
            captured.extend_from_slice(&buf[..n]);
            last_byte = Instant::now();
        }
    }
    Ok(captured)
}

// ============================================================================
// Worker
// ============================================================================

/// Executes one extraction while the mode is `Dumping` and always returns
/// the mode to `Idle` when done.
pub struct ExtractionWorker {
    controller: Arc<ModeController>,
    serial: Arc<dyn SerialOpener>,
    dumps: Arc<DumpStore>,
    cloud: Arc<dyn CloudSync>,
    silence: Duration,
    overall: Duration,
}

impl ExtractionWorker {
    /// Build a worker over the injected capabilities.
    #[must_use]
    pub fn new(
        controller: Arc<ModeController>,
        serial: Arc<dyn SerialOpener>,
        dumps: Arc<DumpStore>,
        cloud: Arc<dyn CloudSync>,
        silence: Duration,
        overall: Duration,
    ) -> Self {
        Self {
            controller,
            serial,
            dumps,
            cloud,
            silence,
            overall,
        }
    }

    /// Run the extraction to completion. The caller must already hold the
    /// `Dumping` mode; this method releases it unconditionally.
    pub async fn run(self) {
        let outcome = self.execute().await;
        match &outcome {
            Ok(record) => {
                info!(
                    filename = %record.filename,
                    size_bytes = record.size_bytes,
                    firmware = ?record.firmware,
                    "extraction finished"
                );
            }
            Err(e) => warn!(error = %e, "extraction failed"),
        }
        self.controller
            .record_dump_outcome(outcome.map_err(|e| e.to_string()));
        self.controller.leave();
    }

    async fn execute(&self) -> Result<DumpRecord> {
        let connection = self.controller.snapshot().connection;
        if !connection.present {
            return Err(SkyhookError::Connection(
                "no device attached".to_string(),
            ));
        }

        let opener = Arc::clone(&self.serial);
        let (silence, overall) = (self.silence, self.overall);
        let path = connection.path.clone();
        let baud = connection.baud;

        // The serial session is blocking I/O; keep it off the runtime
        // threads. The port handle never escapes this closure.
        let captured = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
            let mut port = opener.open(&path, baud)?;
            // Wake the CLI, give it a moment to print its prompt, then drop
            // the echo before the real query.
            port.send_line("#")?;
            std::thread::sleep(Duration::from_millis(100));
            port.clear_input()?;
            port.send_line(DUMP_COMMAND)?;
            read_until_quiet(port.as_mut(), silence, overall)
        })
        .await
        .map_err(|e| SkyhookError::Connection(format!("serial task: {e}")))??;

        if captured.is_empty() {
            return Err(SkyhookError::Protocol(
                "device sent no response to the dump query".to_string(),
            ));
        }

        let text = String::from_utf8_lossy(&captured).into_owned();
        let firmware = identify::detect_identity(&text);
        if firmware.is_none() && !identify::looks_like_cli_output(&text) {
            return Err(SkyhookError::Protocol(
                "no recognizable firmware signature in response".to_string(),
            ));
        }

        let record = self.dumps.write_capture(&text, firmware, Utc::now())?;
        self.cloud.schedule_upload(&self.dumps.dir().join(&record.filename));
        Ok(record)
    }
}
