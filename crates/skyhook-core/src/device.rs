//! Target device presence monitoring.
//!
//! The monitor polls the serial bus once a second, ranks attached ports the
//! way flight controller configurators do (known USB VID:PID pairs first,
//! then CDC-ACM devices, then descriptive strings), and publishes the best
//! candidate as the shared [`ConnectionState`]. Every iteration is
//! failure-isolated: an enumeration error is logged and the loop keeps its
//! schedule.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serialport::{SerialPortType, available_ports};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::mode::{ConnectionState, ModeController};

/// USB VID:PID pairs of common flight controller bridges.
const KNOWN_FC_VID_PID: &[(u16, u16)] = &[
    (0x0483, 0x5740), // STM32 Virtual COM Port
    (0x0483, 0xdf11), // STM32 Bootloader
    (0x10c4, 0xea60), // CP210x
    (0x0403, 0x6001), // FTDI
    (0x0403, 0x6015), // FTDI X-Series
    (0x2341, 0x0001), // Arduino
    (0x2341, 0x0043), // Arduino Uno
    (0x16c0, 0x0483), // Teensy
    (0x1fc9, 0x0083), // NXP
];

const DESCRIPTION_KEYWORDS: &[&str] = &["stm32", "betaflight", "inav", "arduino", "flight"];
const MANUFACTURER_KEYWORDS: &[&str] = &["stm", "silicon labs", "ftdi", "arduino"];

/// A serial port as seen during enumeration, reduced to the fields scoring
/// cares about.
#[derive(Debug, Clone, Default)]
pub struct PortCandidate {
    /// Device path, e.g. `/dev/ttyACM0`.
    pub name: String,
    /// USB vendor id, when the port is USB-backed.
    pub vid: Option<u16>,
    /// USB product id, when the port is USB-backed.
    pub pid: Option<u16>,
    /// USB manufacturer string.
    pub manufacturer: Option<String>,
    /// USB product string.
    pub product: Option<String>,
}

impl PortCandidate {
    /// Likelihood that this port is a flight controller. Zero means "not a
    /// candidate at all".
    #[must_use]
    pub fn score(&self) -> u32 {
        let mut score = 0;

        if let (Some(vid), Some(pid)) = (self.vid, self.pid) {
            if KNOWN_FC_VID_PID.contains(&(vid, pid)) {
                score += 10;
            }
        }

        if self.name.contains("ACM") {
            score += 5;
        } else if self.name.contains("USB") {
            score += 3;
        }

        if let Some(product) = &self.product {
            let product = product.to_lowercase();
            if DESCRIPTION_KEYWORDS.iter().any(|kw| product.contains(kw)) {
                score += 5;
            }
        }

        if let Some(manufacturer) = &self.manufacturer {
            let manufacturer = manufacturer.to_lowercase();
            if MANUFACTURER_KEYWORDS.iter().any(|kw| manufacturer.contains(kw)) {
                score += 3;
            }
        }

        score
    }
}

/// Pick the most plausible flight controller among the candidates.
#[must_use]
pub fn best_candidate(candidates: Vec<PortCandidate>) -> Option<PortCandidate> {
    candidates
        .into_iter()
        .map(|c| (c.score(), c))
        .filter(|(score, _)| *score > 0)
        .max_by_key(|(score, _)| *score)
        .map(|(_, c)| c)
}

/// Enumerate the system's serial ports as scoring candidates.
///
/// # Errors
///
/// Returns an error when the platform enumeration itself fails.
pub fn system_candidates() -> Result<Vec<PortCandidate>> {
    let ports = available_ports()
        .map_err(|e| crate::error::SkyhookError::Connection(format!("port enumeration: {e}")))?;

    Ok(ports
        .into_iter()
        .map(|port| {
            let mut candidate = PortCandidate {
                name: port.port_name,
                ..PortCandidate::default()
            };
            if let SerialPortType::UsbPort(usb) = port.port_type {
                candidate.vid = Some(usb.vid);
                candidate.pid = Some(usb.pid);
                candidate.manufacturer = usb.manufacturer;
                candidate.product = usb.product;
            }
            candidate
        })
        .collect())
}

/// Periodically detects attachment and removal of the target device.
pub struct DeviceMonitor {
    controller: Arc<ModeController>,
    fallback_path: String,
    baud: u32,
    poll: Duration,
}

impl DeviceMonitor {
    /// Build a monitor that publishes into `controller`.
    #[must_use]
    pub fn new(
        controller: Arc<ModeController>,
        fallback_path: String,
        baud: u32,
        poll: Duration,
    ) -> Self {
        Self {
            controller,
            fallback_path,
            baud,
            poll,
        }
    }

    /// Run until the shutdown channel flips.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.poll);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(poll_ms = self.poll.as_millis() as u64, "device monitor started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!(error = %e, "device poll failed, skipping iteration");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        debug!("device monitor stopped");
    }

    async fn tick(&self) -> Result<()> {
        let candidates = tokio::task::spawn_blocking(system_candidates)
            .await
            .map_err(|e| crate::error::SkyhookError::Connection(format!("enumeration task: {e}")))??;

        let previous = self.controller.snapshot().connection;
        let next = self.resolve(candidates);

        if next.present != previous.present || next.path != previous.path {
            if next.present {
                info!(path = %next.path, description = ?next.description, "device attached");
            } else {
                info!(path = %previous.path, "device removed");
            }
        }
        self.controller.update_connection(next);
        Ok(())
    }

    fn resolve(&self, candidates: Vec<PortCandidate>) -> ConnectionState {
        if let Some(best) = best_candidate(candidates) {
            return ConnectionState {
                present: true,
                path: best.name,
                baud: self.baud,
                description: best.product,
            };
        }

        // Non-USB wiring (or a configurator-invisible adapter) still counts
        // when the configured device node exists.
        if Path::new(&self.fallback_path).exists() {
            return ConnectionState {
                present: true,
                path: self.fallback_path.clone(),
                baud: self.baud,
                description: None,
            };
        }

        ConnectionState::absent(self.fallback_path.clone(), self.baud)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usb(name: &str, vid: u16, pid: u16) -> PortCandidate {
        PortCandidate {
            name: name.to_string(),
            vid: Some(vid),
            pid: Some(pid),
            ..PortCandidate::default()
        }
    }

    #[test]
    fn test_known_vid_pid_outranks_generic_usb() {
        let stm32 = usb("/dev/ttyACM0", 0x0483, 0x5740);
        let generic = usb("/dev/ttyUSB0", 0x1234, 0x5678);
        assert!(stm32.score() > generic.score());
    }

    #[test]
    fn test_acm_beats_plain_usb_name() {
        let acm = PortCandidate {
            name: "/dev/ttyACM0".into(),
            ..PortCandidate::default()
        };
        let usb = PortCandidate {
            name: "/dev/ttyUSB0".into(),
            ..PortCandidate::default()
        };
        assert!(acm.score() > usb.score());
    }

    #[test]
    fn test_description_and_manufacturer_contribute() {
        let described = PortCandidate {
            name: "/dev/ttyACM0".into(),
            product: Some("Betaflight STM32 Virtual ComPort".into()),
            manufacturer: Some("STMicroelectronics".into()),
            ..PortCandidate::default()
        };
        // 5 (ACM) + 5 (description) + 3 (manufacturer)
        assert_eq!(described.score(), 13);
    }

    #[test]
    fn test_unrelated_port_scores_zero() {
        let onboard = PortCandidate {
            name: "/dev/ttyS0".into(),
            ..PortCandidate::default()
        };
        assert_eq!(onboard.score(), 0);
    }

    #[test]
    fn test_best_candidate_prefers_highest_score() {
        let best = best_candidate(vec![
            usb("/dev/ttyUSB0", 0x1111, 0x2222),
            usb("/dev/ttyACM0", 0x0483, 0x5740),
        ])
        .unwrap();
        assert_eq!(best.name, "/dev/ttyACM0");
    }

    #[test]
    fn test_best_candidate_none_when_nothing_plausible() {
        let nothing = best_candidate(vec![PortCandidate {
            name: "/dev/ttyS0".into(),
            ..PortCandidate::default()
        }]);
        assert!(nothing.is_none());
    }

    #[test]
    fn test_resolve_falls_back_to_absent() {
        let controller = Arc::new(ModeController::new(ConnectionState::absent(
            "/nonexistent/ttyACM9".into(),
            115_200,
        )));
        let monitor = DeviceMonitor::new(
            controller,
            "/nonexistent/ttyACM9".into(),
            115_200,
            Duration::from_secs(1),
        );
        let state = monitor.resolve(Vec::new());
        assert!(!state.present);
        assert_eq!(state.path, "/nonexistent/ttyACM9");
    }
}
