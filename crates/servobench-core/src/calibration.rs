//! Per-channel servo calibration records.
//!
//! Each of the 16 PWM channels carries one [`ServoCalibration`] record:
//! the pulse endpoints of the mechanical sweep, a signed center correction
//! for horn misalignment, the last commanded angle and a display name.

use serde::{Deserialize, Serialize};

/// Number of addressable servo channels on the PWM peripheral.
pub const SERVO_COUNT: usize = 16;

/// Default pulse width at 0 degrees.
pub const DEFAULT_MIN_PULSE: i32 = 150;

/// Default pulse width at 180 degrees.
pub const DEFAULT_MAX_PULSE: i32 = 600;

/// Default commanded angle (mechanical center).
pub const DEFAULT_ANGLE: i32 = 90;

/// Default PWM frequency in Hz.
pub const DEFAULT_FREQUENCY_HZ: u32 = 50;

/// Calibration state for a single servo channel.
///
/// `min_pulse` and `max_pulse` are caller-supplied and deliberately not
/// cross-validated: a record with `min_pulse > max_pulse` inverts the
/// direction of travel. `current_angle` is always within [0, 180].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServoCalibration {
    /// Pulse width commanded at angle 0.
    pub min_pulse: i32,

    /// Pulse width commanded at angle 180.
    pub max_pulse: i32,

    /// Signed correction applied at the center of the sweep.
    pub center_offset: i32,

    /// Last commanded angle, clamped to [0, 180].
    pub current_angle: i32,

    /// Human-readable label.
    pub name: String,
}

impl ServoCalibration {
    /// Default record for the given channel index (`"Servo {index+1}"`).
    pub fn default_for(index: usize) -> Self {
        Self {
            min_pulse: DEFAULT_MIN_PULSE,
            max_pulse: DEFAULT_MAX_PULSE,
            center_offset: 0,
            current_angle: DEFAULT_ANGLE,
            name: default_name(index),
        }
    }

    /// Record synthesized for reads of an out-of-range channel.
    ///
    /// Readers never observe partially-initialized state; an invalid index
    /// yields this record instead.
    pub fn invalid() -> Self {
        Self {
            min_pulse: DEFAULT_MIN_PULSE,
            max_pulse: DEFAULT_MAX_PULSE,
            center_offset: 0,
            current_angle: DEFAULT_ANGLE,
            name: "Invalid".to_string(),
        }
    }
}

/// Default display name for a channel (1-based, matching the web UI).
pub fn default_name(index: usize) -> String {
    format!("Servo {}", index + 1)
}
