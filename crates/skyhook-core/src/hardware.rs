//! Hardware capability interfaces.
//!
//! GPIO and indicator access is injected rather than reached for directly,
//! keeping the orchestration core hardware-independent and testable on any
//! platform. Two button backends ship here: the sysfs GPIO reader used on
//! the target device, and a fixed-level backend for development machines
//! without the hardware (the service runs in a degraded "emulation" posture
//! rather than refusing to start).

use std::io::ErrorKind;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Result, SkyhookError};

/// Raw button levels as sampled this instant. `true` means pressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonLevels {
    /// Dump trigger button.
    pub dump: bool,
    /// Pairing trigger button.
    pub pair: bool,
}

/// Source of physical button levels.
pub trait ButtonInput: Send + Sync {
    /// Sample both buttons. Implementations translate electrical polarity;
    /// callers only ever see pressed/released.
    ///
    /// # Errors
    ///
    /// Returns [`SkyhookError::Permission`] when the platform denies pin
    /// access and [`SkyhookError::Io`] for transient read failures.
    fn read(&self) -> Result<ButtonLevels>;
}

/// Pass-through control of the LED strip and buzzer for hardware tests.
///
/// The orchestration core never calls this; it exists so the HTTP surface
/// can exercise the indicators without owning pattern rendering.
pub trait IndicatorHardware: Send + Sync {
    /// Apply an LED action such as `red`, `green`, or `off`.
    ///
    /// # Errors
    ///
    /// Returns an error when the indicator backend rejects the action.
    fn led(&self, action: &str) -> Result<()>;

    /// Apply a buzzer action such as `on`.
    ///
    /// # Errors
    ///
    /// Returns an error when the indicator backend rejects the action.
    fn buzzer(&self, action: &str) -> Result<()>;
}

// ============================================================================
// Sysfs GPIO buttons
// ============================================================================

/// One exported sysfs GPIO line, read as an input.
#[derive(Debug, Clone)]
struct GpioLine {
    pin: u8,
    value_path: PathBuf,
}

impl GpioLine {
    fn open(pin: u8) -> Result<Self> {
        let base = PathBuf::from("/sys/class/gpio");
        let dir = base.join(format!("gpio{pin}"));

        if !dir.exists() {
            if let Err(e) = std::fs::write(base.join("export"), pin.to_string()) {
                // EBUSY when a previous run already exported the pin.
                if !dir.exists() {
                    return Err(map_gpio_error(pin, &e));
                }
            }
        }
        std::fs::write(dir.join("direction"), "in").map_err(|e| map_gpio_error(pin, &e))?;

        Ok(Self {
            pin,
            value_path: dir.join("value"),
        })
    }

    /// Electrical level: buttons are wired active-low with pull-ups, so a
    /// `0` reading means pressed.
    fn is_pressed(&self) -> Result<bool> {
        let raw = std::fs::read_to_string(&self.value_path)
            .map_err(|e| map_gpio_error(self.pin, &e))?;
        Ok(raw.trim() == "0")
    }
}

fn map_gpio_error(pin: u8, e: &std::io::Error) -> SkyhookError {
    if e.kind() == ErrorKind::PermissionDenied {
        SkyhookError::Permission(format!("gpio{pin}: {e}"))
    } else {
        SkyhookError::Io(std::io::Error::new(e.kind(), format!("gpio{pin}: {e}")))
    }
}

/// Button input backed by `/sys/class/gpio`.
#[derive(Debug)]
pub struct SysfsButtonInput {
    dump: GpioLine,
    pair: GpioLine,
}

impl SysfsButtonInput {
    /// Export and configure both button pins as inputs.
    ///
    /// # Errors
    ///
    /// Returns [`SkyhookError::Permission`] when the process may not touch
    /// the GPIO sysfs tree (the usual failure on a dev machine).
    pub fn new(dump_pin: u8, pair_pin: u8) -> Result<Self> {
        let dump = GpioLine::open(dump_pin)?;
        let pair = GpioLine::open(pair_pin)?;
        info!(dump_pin, pair_pin, "GPIO buttons configured");
        Ok(Self { dump, pair })
    }
}

impl ButtonInput for SysfsButtonInput {
    fn read(&self) -> Result<ButtonLevels> {
        Ok(ButtonLevels {
            dump: self.dump.is_pressed()?,
            pair: self.pair.is_pressed()?,
        })
    }
}

// ============================================================================
// Fixed backend (no hardware)
// ============================================================================

/// Button input that always reports the same levels. Default is both
/// released, which makes a dev machine behave like an untouched device.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedButtonInput {
    levels: ButtonLevels,
}

impl FixedButtonInput {
    /// A backend pinned to the given levels.
    #[must_use]
    pub const fn new(levels: ButtonLevels) -> Self {
        Self { levels }
    }
}

impl ButtonInput for FixedButtonInput {
    fn read(&self) -> Result<ButtonLevels> {
        Ok(self.levels)
    }
}

/// Indicator backend that only logs. Used when the LED/buzzer renderer is
/// not wired up, and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullIndicators;

impl IndicatorHardware for NullIndicators {
    fn led(&self, action: &str) -> Result<()> {
        debug!(action, "led pass-through (no indicator backend)");
        Ok(())
    }

    fn buzzer(&self, action: &str) -> Result<()> {
        debug!(action, "buzzer pass-through (no indicator backend)");
        Ok(())
    }
}

/// Components addressable by the hardware pass-through test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestComponent {
    /// The LED strip.
    Led,
    /// The buzzer.
    Buzzer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_input_reports_configured_levels() {
        let input = FixedButtonInput::new(ButtonLevels { dump: true, pair: false });
        let levels = input.read().unwrap();
        assert!(levels.dump);
        assert!(!levels.pair);
    }

    #[test]
    fn test_default_fixed_input_is_released() {
        let levels = FixedButtonInput::default().read().unwrap();
        assert_eq!(levels, ButtonLevels::default());
    }

    #[test]
    fn test_null_indicators_accept_any_action() {
        let indicators = NullIndicators;
        indicators.led("red").unwrap();
        indicators.led("off").unwrap();
        indicators.buzzer("on").unwrap();
    }

    #[test]
    fn test_component_parses_lowercase() {
        let led: TestComponent = serde_json::from_str("\"led\"").unwrap();
        assert_eq!(led, TestComponent::Led);
        let buzzer: TestComponent = serde_json::from_str("\"buzzer\"").unwrap();
        assert_eq!(buzzer, TestComponent::Buzzer);
    }
}
