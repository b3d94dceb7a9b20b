//! Firmware identity detection over captured CLI output.
//!
//! A dump is considered recognizable when one of a small set of firmware
//! markers appears within the first [`IDENTITY_SCAN_LINES`] lines. The match
//! returns the whole identity line so status reporting can show the exact
//! firmware and target, e.g. `Betaflight / STM32F405 (S405) 4.4.0`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Only the head of a capture is scanned; real dumps announce themselves in
/// their banner, and scanning megabytes of `set` lines would be wasted work.
pub const IDENTITY_SCAN_LINES: usize = 20;

static FIRMWARE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(betaflight|inav|emuflight|cleanflight|rotorflight|ardupilot)\b")
        .expect("firmware marker pattern is valid")
});

/// Scan the first [`IDENTITY_SCAN_LINES`] lines for a known firmware marker.
///
/// Returns the identity line with comment prefix and whitespace trimmed, or
/// `None` when nothing recognizable appears.
#[must_use]
pub fn detect_identity(text: &str) -> Option<String> {
    text.lines()
        .take(IDENTITY_SCAN_LINES)
        .find(|line| FIRMWARE_MARKER.is_match(line))
        .map(|line| line.trim_start_matches(['#', ' ']).trim_end().to_string())
}

/// Heuristic for "the device answered with something that looks like CLI
/// output" as opposed to line noise. A capture with no recognizable identity
/// can still be worth keeping when it reads like a configuration dump.
#[must_use]
pub fn looks_like_cli_output(text: &str) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    let printable = text
        .bytes()
        .filter(|b| b.is_ascii_graphic() || b.is_ascii_whitespace())
        .count();
    // Mostly printable, and at least one line shaped like a CLI echo or a
    // settings statement.
    printable * 10 >= text.len() * 9
        && text
            .lines()
            .take(IDENTITY_SCAN_LINES)
            .any(|line| line.starts_with('#') || line.starts_with("set ") || line.starts_with("feature "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_betaflight_banner() {
        let capture = "# dump\n# version\n# Betaflight / STM32F405 (S405) 4.4.0 Apr  1 2023 / 12:00:00\n";
        let identity = detect_identity(capture).unwrap();
        assert_eq!(
            identity,
            "Betaflight / STM32F405 (S405) 4.4.0 Apr  1 2023 / 12:00:00"
        );
    }

    #[test]
    fn test_detects_inav_case_insensitive() {
        let capture = "# INAV/MATEKF405 6.0.0\n";
        assert!(detect_identity(capture).unwrap().contains("INAV"));
    }

    #[test]
    fn test_marker_outside_scan_window_is_ignored() {
        let mut capture = String::new();
        for i in 0..IDENTITY_SCAN_LINES {
            capture.push_str(&format!("set line_{i} = 0\n"));
        }
        capture.push_str("# Betaflight / STM32F722 4.3.1\n");
        assert!(detect_identity(&capture).is_none());
    }

    #[test]
    fn test_no_marker_in_garbage() {
        assert!(detect_identity("\u{1}\u{2}\u{3}zzzz").is_none());
        assert!(detect_identity("").is_none());
    }

    #[test]
    fn test_cli_output_heuristic() {
        assert!(looks_like_cli_output("# dump\nset gyro_hardware_lpf = NORMAL\n"));
        assert!(looks_like_cli_output("feature -RX_PARALLEL_PWM\nfeature RX_SERIAL\n"));
        assert!(!looks_like_cli_output(""));
        assert!(!looks_like_cli_output("   \n  \n"));
        assert!(!looks_like_cli_output("lorem ipsum dolor sit amet"));
    }

    #[test]
    fn test_binary_noise_is_not_cli_output() {
        let noise: String = (0u8..=31).map(|b| b as char).collect();
        assert!(!looks_like_cli_output(&noise));
    }
}
