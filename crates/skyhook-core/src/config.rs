//! Application configuration management.
//!
//! Configuration is a single TOML file read once at process start and
//! immutable thereafter. Covers the serial port defaults, button/LED pin
//! assignments, dump directory and timing thresholds, the network bridge
//! port, the pairing window, and the cloud sync remote.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkyhookError};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyhookConfig {
    /// Serial device defaults.
    pub serial: SerialConfig,
    /// GPIO pin assignments.
    pub hardware: HardwareConfig,
    /// Dump capture behavior.
    pub dump: DumpConfig,
    /// Serial-to-TCP bridge behavior.
    pub bridge: BridgeConfig,
    /// Radio pairing window.
    pub pairing: PairingConfig,
    /// Cloud sync hand-off.
    pub cloud: CloudConfig,
    /// HTTP server binding.
    pub server: ServerConfig,
}

/// Serial device defaults, used until the device monitor sees a better
/// candidate on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path to fall back to, e.g. `/dev/ttyACM0`.
    pub port: String,
    /// Baud rate for the CLI session.
    pub baud: u32,
}

/// GPIO pin assignments (BCM numbering) for the physical controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// Active-low dump trigger button.
    pub button_dump_pin: u8,
    /// Active-low pairing trigger button.
    pub button_pair_pin: u8,
    /// LED strip data pin.
    pub led_pin: u8,
    /// Number of LEDs on the strip.
    pub led_count: u8,
    /// LED brightness, 0.0..=1.0.
    pub led_brightness: f32,
    /// Buzzer output pin.
    pub buzzer_pin: u8,
    /// Button sampling interval.
    pub button_poll_ms: u64,
    /// A raw level must hold this long before the debounced level changes.
    pub debounce_ms: u64,
}

/// Dump capture behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// Directory that receives dump files.
    pub directory: PathBuf,
    /// Capture ends once no byte has arrived for this long.
    pub silence_threshold_ms: u64,
    /// Absolute ceiling on a capture session.
    pub read_timeout_secs: u64,
    /// Device bus polling interval.
    pub device_poll_ms: u64,
}

/// Serial-to-TCP bridge behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// TCP port the bridge listens on.
    pub tcp_port: u16,
    /// Supervisor loop interval.
    pub poll_ms: u64,
    /// How long a stopped bridge may take to exit before it is killed.
    pub stop_grace_secs: u64,
}

/// Radio pairing window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingConfig {
    /// How long the radio stays discoverable.
    pub window_secs: u64,
}

/// Cloud sync hand-off. The upload itself is an external collaborator; the
/// extraction worker only signals it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Whether to hand new dumps to the sync collaborator at all.
    pub enabled: bool,
    /// rclone remote spec, e.g. `gdrive:skyhook-dumps`.
    pub remote: String,
}

/// HTTP server binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind, e.g. `0.0.0.0`.
    pub bind_addr: String,
    /// TCP port for the REST API.
    pub port: u16,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud: 115_200,
        }
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            button_dump_pin: 23,
            button_pair_pin: 24,
            led_pin: 18,
            led_count: 4,
            led_brightness: 0.2,
            buzzer_pin: 25,
            button_poll_ms: 50,
            debounce_ms: 30,
        }
    }
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            directory: default_dump_dir(),
            silence_threshold_ms: 500,
            read_timeout_secs: 10,
            device_poll_ms: 1000,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            tcp_port: 5000,
            poll_ms: 1000,
            stop_grace_secs: 5,
        }
    }
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self { window_secs: 30 }
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            remote: "gdrive:skyhook-dumps".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for SkyhookConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            hardware: HardwareConfig::default(),
            dump: DumpConfig::default(),
            bridge: BridgeConfig::default(),
            pairing: PairingConfig::default(),
            cloud: CloudConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl SkyhookConfig {
    /// Load configuration from the default path, falling back to defaults
    /// when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// validated.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path()?)
    }

    /// Load configuration from an explicit path, falling back to defaults
    /// when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// validated.
    pub fn load_from(path: PathBuf) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content).map_err(|e| SkyhookError::ConfigParse(e.to_string()))?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`SkyhookError::ConfigValidation`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.serial.baud == 0 {
            return Err(SkyhookError::ConfigValidation {
                field: "serial.baud",
                message: "must be non-zero".into(),
            });
        }
        if self.dump.silence_threshold_ms == 0 {
            return Err(SkyhookError::ConfigValidation {
                field: "dump.silence_threshold_ms",
                message: "must be non-zero".into(),
            });
        }
        if self.dump.read_timeout_secs == 0 {
            return Err(SkyhookError::ConfigValidation {
                field: "dump.read_timeout_secs",
                message: "must be non-zero".into(),
            });
        }
        if self.dump.silence_threshold_ms >= self.dump.read_timeout_secs * 1000 {
            return Err(SkyhookError::ConfigValidation {
                field: "dump.silence_threshold_ms",
                message: "must be shorter than the absolute read timeout".into(),
            });
        }
        if self.bridge.tcp_port == 0 {
            return Err(SkyhookError::ConfigValidation {
                field: "bridge.tcp_port",
                message: "must be non-zero".into(),
            });
        }
        if self.pairing.window_secs == 0 {
            return Err(SkyhookError::ConfigValidation {
                field: "pairing.window_secs",
                message: "must be non-zero".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.hardware.led_brightness) {
            return Err(SkyhookError::ConfigValidation {
                field: "hardware.led_brightness",
                message: "must be within 0.0..=1.0".into(),
            });
        }
        Ok(())
    }

    /// Capture ends once no byte has arrived for this long.
    #[must_use]
    pub const fn silence_threshold(&self) -> Duration {
        Duration::from_millis(self.dump.silence_threshold_ms)
    }

    /// Absolute ceiling on a capture session.
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.dump.read_timeout_secs)
    }

    /// Radio discoverability window.
    #[must_use]
    pub const fn pairing_window(&self) -> Duration {
        Duration::from_secs(self.pairing.window_secs)
    }

    /// Get the configuration file path.
    fn config_path() -> Result<PathBuf> {
        // On the target device: /etc/skyhook/config.toml
        // For development: ~/.config/skyhook/config.toml
        #[cfg(target_os = "linux")]
        {
            Ok(PathBuf::from("/etc/skyhook/config.toml"))
        }
        #[cfg(not(target_os = "linux"))]
        {
            let dirs = directories::ProjectDirs::from("", "", "skyhook").ok_or_else(|| {
                SkyhookError::ConfigNotFound(PathBuf::from("<no config directory>"))
            })?;
            Ok(dirs.config_dir().join("config.toml"))
        }
    }
}

fn default_dump_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/var/lib/skyhook/dumps")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "skyhook")
            .map(|dirs| dirs.data_dir().join("dumps"))
            .unwrap_or_else(|| PathBuf::from("./dumps"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        SkyhookConfig::default().validate().unwrap();
    }

    #[test]
    fn test_default_serial() {
        let config = SkyhookConfig::default();
        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert_eq!(config.serial.baud, 115_200);
    }

    #[test]
    fn test_rejects_zero_baud() {
        let mut config = SkyhookConfig::default();
        config.serial.baud = 0;
        let err = config.validate().unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_rejects_silence_threshold_at_or_above_timeout() {
        let mut config = SkyhookConfig::default();
        config.dump.silence_threshold_ms = 10_000;
        config.dump.read_timeout_secs = 10;
        assert!(config.validate().is_err());

        config.dump.silence_threshold_ms = 9_999;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_brightness() {
        let mut config = SkyhookConfig::default();
        config.hardware.led_brightness = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parses_partial_toml() {
        let toml = r#"
            [serial]
            port = "/dev/ttyUSB0"
            baud = 57600

            [pairing]
            window_secs = 45
        "#;
        let config: SkyhookConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud, 57_600);
        assert_eq!(config.pairing.window_secs, 45);
        // Untouched sections keep their defaults.
        assert_eq!(config.bridge.tcp_port, 5000);
        assert_eq!(config.dump.silence_threshold_ms, 500);
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SkyhookConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.serial.baud, 115_200);
    }

    #[test]
    fn test_load_from_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "serial = not valid toml").unwrap();
        let err = SkyhookConfig::load_from(path).unwrap_err();
        assert!(matches!(err, SkyhookError::ConfigParse(_)));
    }

    #[test]
    fn test_duration_accessors() {
        let config = SkyhookConfig::default();
        assert_eq!(config.silence_threshold(), Duration::from_millis(500));
        assert_eq!(config.read_timeout(), Duration::from_secs(10));
        assert_eq!(config.pairing_window(), Duration::from_secs(30));
    }
}
