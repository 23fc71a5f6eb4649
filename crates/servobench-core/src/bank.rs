//! The servo bank.
//!
//! [`ServoBank`] is the exclusive in-process owner of the 16-record
//! calibration array, the global PWM frequency, and the two capability
//! handles. All state changes go through its mutators; there is no raw
//! access to the backing array. Access is single-writer by construction:
//! the transport layer serializes command delivery.
//!
//! Every mutator reports whether it applied (`true`) or rejected the
//! input (`false`, out-of-range channel or frequency). Rejection leaves
//! all state untouched and never reaches the PWM peripheral.

use tracing::warn;

use crate::calibration::{ServoCalibration, DEFAULT_FREQUENCY_HZ, SERVO_COUNT};
use crate::mapper::{clamp_angle, pulse_for_angle};
use crate::persist::KEY_FREQ;
use crate::pwm::PwmOutput;
use crate::settings::{SettingsStore, StorageError};

/// Lowest accepted PWM frequency in Hz.
pub const FREQUENCY_MIN_HZ: u32 = 40;

/// Highest accepted PWM frequency in Hz.
pub const FREQUENCY_MAX_HZ: u32 = 1000;

/// Owns the per-channel calibration array and drives the PWM capability.
pub struct ServoBank<P, S> {
    pub(crate) servos: [ServoCalibration; SERVO_COUNT],
    pub(crate) frequency_hz: u32,
    pub(crate) pwm: P,
    pub(crate) settings: S,
}

impl<P: PwmOutput, S: SettingsStore> ServoBank<P, S> {
    /// Create a bank with all channels at their documented defaults.
    ///
    /// No state is loaded and nothing is driven; call [`restore`] to pull
    /// persisted calibration and move the servos.
    ///
    /// [`restore`]: ServoBank::restore
    pub fn new(pwm: P, settings: S) -> Self {
        Self {
            servos: std::array::from_fn(ServoCalibration::default_for),
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            pwm,
            settings,
        }
    }

    /// Load persisted state (if any) and drive every channel to its
    /// current angle so the hardware reflects the restored calibration.
    ///
    /// Returns `Ok(true)` when prior state was found and applied.
    pub fn restore(&mut self) -> Result<bool, StorageError> {
        let loaded = self.load_all()?;
        for channel in 0..SERVO_COUNT {
            let angle = self.servos[channel].current_angle;
            self.set_position(channel, angle);
        }
        Ok(loaded)
    }

    /// Command one channel to a logical angle.
    ///
    /// The angle is clamped to [0, 180], recorded as the channel's current
    /// angle, mapped to a pulse under the channel's calibration and
    /// forwarded to the PWM capability.
    pub fn set_position(&mut self, channel: usize, angle: i32) -> bool {
        if channel >= SERVO_COUNT {
            return false;
        }
        let angle = clamp_angle(angle);
        self.servos[channel].current_angle = angle;
        let pulse = pulse_for_angle(&self.servos[channel], angle);
        self.pwm.set_channel_pulse(channel, pulse);
        true
    }

    /// Command every channel to the same angle, ascending channel order.
    pub fn set_all_positions(&mut self, angle: i32) {
        for channel in 0..SERVO_COUNT {
            self.set_position(channel, angle);
        }
    }

    /// Last commanded angle for a channel, or the default center (90) for
    /// an invalid channel.
    pub fn current_position(&self, channel: usize) -> i32 {
        match self.servos.get(channel) {
            Some(cal) => cal.current_angle,
            None => ServoCalibration::invalid().current_angle,
        }
    }

    /// Overwrite a channel's calibration, persist it, and re-drive the
    /// channel at its unchanged current angle so the servo physically
    /// tracks the new mapping.
    ///
    /// A persistence failure is logged and does not un-apply the
    /// in-memory change; the device stays drivable with broken storage.
    pub fn calibrate(
        &mut self,
        channel: usize,
        min_pulse: i32,
        max_pulse: i32,
        center_offset: i32,
        name: &str,
    ) -> bool {
        if channel >= SERVO_COUNT {
            return false;
        }
        {
            let cal = &mut self.servos[channel];
            cal.min_pulse = min_pulse;
            cal.max_pulse = max_pulse;
            cal.center_offset = center_offset;
            cal.name = name.to_string();
        }
        if let Err(err) = self.save_one(channel) {
            warn!(channel, error = %err, "calibration applied but not persisted");
        }
        let angle = self.servos[channel].current_angle;
        self.set_position(channel, angle);
        true
    }

    /// Copy of a channel's record, or the synthesized `"Invalid"` record
    /// for an out-of-range channel.
    pub fn config(&self, channel: usize) -> ServoCalibration {
        match self.servos.get(channel) {
            Some(cal) => cal.clone(),
            None => ServoCalibration::invalid(),
        }
    }

    /// Set the global PWM frequency. Accepts [40, 1000] Hz only; anything
    /// outside leaves the frequency unchanged and returns `false`.
    ///
    /// An accepted frequency is forwarded to the PWM capability and
    /// persisted immediately (persistence failure is logged, the new
    /// frequency stays in effect).
    pub fn set_frequency(&mut self, hz: u32) -> bool {
        if !(FREQUENCY_MIN_HZ..=FREQUENCY_MAX_HZ).contains(&hz) {
            return false;
        }
        self.pwm.set_frequency(hz);
        self.frequency_hz = hz;
        if let Err(err) = self.settings.put_u32(KEY_FREQ, hz) {
            warn!(hz, error = %err, "frequency applied but not persisted");
        }
        true
    }

    /// Current global PWM frequency in Hz.
    pub fn frequency(&self) -> u32 {
        self.frequency_hz
    }

    /// Number of addressable channels.
    pub fn servo_count(&self) -> usize {
        SERVO_COUNT
    }
}
