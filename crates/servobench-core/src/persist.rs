//! Persistence of the servo bank to the settings store.
//!
//! Schema, all keys flat within the store's namespace:
//!
//! | key                | type   | default on load        |
//! |--------------------|--------|------------------------|
//! | `hasSettings`      | bool   | false (nothing loaded) |
//! | `freq`             | u32    | 50                     |
//! | `servo{i}_min`     | i32    | 150                    |
//! | `servo{i}_max`     | i32    | 600                    |
//! | `servo{i}_center`  | i32    | 0                      |
//! | `servo{i}_name`    | string | `"Servo {i+1}"`        |
//!
//! Each write is an independent transaction; a power loss mid-save can
//! leave a partially updated store. Loading recovers per key: any absent
//! key falls back to its documented default, so a partial prior save
//! still restores cleanly.

use tracing::info;

use crate::bank::ServoBank;
use crate::calibration::{
    default_name, DEFAULT_FREQUENCY_HZ, DEFAULT_MAX_PULSE, DEFAULT_MIN_PULSE, SERVO_COUNT,
};
use crate::pwm::PwmOutput;
use crate::settings::{SettingsStore, StorageError};

/// Namespace the settings store is expected to scope these keys under.
pub const SETTINGS_NAMESPACE: &str = "servo-config";

pub(crate) const KEY_HAS_SETTINGS: &str = "hasSettings";
pub(crate) const KEY_FREQ: &str = "freq";

fn servo_key(channel: usize, field: &str) -> String {
    format!("servo{channel}_{field}")
}

impl<P: PwmOutput, S: SettingsStore> ServoBank<P, S> {
    /// Persist the whole bank: the sentinel, the frequency, then every
    /// channel in ascending order.
    pub fn save_all(&mut self) -> Result<(), StorageError> {
        self.settings.put_bool(KEY_HAS_SETTINGS, true)?;
        self.settings.put_u32(KEY_FREQ, self.frequency_hz)?;
        for channel in 0..SERVO_COUNT {
            self.save_one(channel)?;
        }
        info!("servo settings saved");
        Ok(())
    }

    /// Restore the whole bank from the store.
    ///
    /// Without the `hasSettings` sentinel nothing is touched and
    /// `Ok(false)` is returned: first boot keeps the in-memory defaults.
    /// Otherwise the frequency is applied to the PWM capability and every
    /// channel is loaded with per-key defaulting.
    pub fn load_all(&mut self) -> Result<bool, StorageError> {
        if !self.settings.get_bool(KEY_HAS_SETTINGS)?.unwrap_or(false) {
            info!("no saved servo settings, keeping defaults");
            return Ok(false);
        }

        let freq = self
            .settings
            .get_u32(KEY_FREQ)?
            .unwrap_or(DEFAULT_FREQUENCY_HZ);
        self.frequency_hz = freq;
        self.pwm.set_frequency(freq);

        for channel in 0..SERVO_COUNT {
            self.load_one(channel)?;
        }
        info!(frequency = freq, "servo settings loaded");
        Ok(true)
    }

    /// Persist a single channel's four keys. Backs `calibrate`'s
    /// immediate low-latency save without rewriting the whole store.
    pub fn save_one(&mut self, channel: usize) -> Result<(), StorageError> {
        if channel >= SERVO_COUNT {
            return Ok(());
        }
        let min_pulse = self.servos[channel].min_pulse;
        let max_pulse = self.servos[channel].max_pulse;
        let center_offset = self.servos[channel].center_offset;
        let name = self.servos[channel].name.clone();

        self.settings.put_i32(&servo_key(channel, "min"), min_pulse)?;
        self.settings.put_i32(&servo_key(channel, "max"), max_pulse)?;
        self.settings
            .put_i32(&servo_key(channel, "center"), center_offset)?;
        self.settings.put_string(&servo_key(channel, "name"), &name)?;
        Ok(())
    }

    /// Load a single channel's four keys, each falling back to its
    /// documented default when absent. The current angle is not
    /// persisted and is left untouched.
    pub fn load_one(&mut self, channel: usize) -> Result<(), StorageError> {
        if channel >= SERVO_COUNT {
            return Ok(());
        }
        let min_pulse = self
            .settings
            .get_i32(&servo_key(channel, "min"))?
            .unwrap_or(DEFAULT_MIN_PULSE);
        let max_pulse = self
            .settings
            .get_i32(&servo_key(channel, "max"))?
            .unwrap_or(DEFAULT_MAX_PULSE);
        let center_offset = self
            .settings
            .get_i32(&servo_key(channel, "center"))?
            .unwrap_or(0);
        let name = self
            .settings
            .get_string(&servo_key(channel, "name"))?
            .unwrap_or_else(|| default_name(channel));

        let cal = &mut self.servos[channel];
        cal.min_pulse = min_pulse;
        cal.max_pulse = max_pulse;
        cal.center_offset = center_offset;
        cal.name = name;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pwm::NullPwm;
    use crate::settings::MemorySettings;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_save_load_round_trip() {
        let store = MemorySettings::new();
        let mut saved = ServoBank::new(NullPwm, store.clone());
        saved.calibrate(0, 100, 500, -5, "Base");
        saved.calibrate(7, 200, 700, 12, "Wrist");
        saved.set_frequency(60);
        saved.save_all().unwrap();

        let mut restored = ServoBank::new(NullPwm, store);
        assert!(restored.load_all().unwrap());

        assert_eq!(restored.frequency(), 60);
        for channel in 0..SERVO_COUNT {
            let expected = saved.config(channel);
            let loaded = restored.config(channel);
            assert_eq!(loaded.min_pulse, expected.min_pulse);
            assert_eq!(loaded.max_pulse, expected.max_pulse);
            assert_eq!(loaded.center_offset, expected.center_offset);
            assert_eq!(loaded.name, expected.name);
        }
    }

    #[test]
    fn test_load_without_sentinel_keeps_defaults() {
        let store = MemorySettings::new();
        let mut bank = ServoBank::new(NullPwm, store);
        assert!(!bank.load_all().unwrap());

        assert_eq!(bank.frequency(), 50);
        for channel in 0..SERVO_COUNT {
            let cal = bank.config(channel);
            assert_eq!(cal.min_pulse, 150);
            assert_eq!(cal.max_pulse, 600);
            assert_eq!(cal.center_offset, 0);
            assert_eq!(cal.name, default_name(channel));
        }
    }

    #[test]
    fn test_partial_schema_recovery() {
        // A mid-save power loss can leave only some keys behind; each key
        // recovers independently.
        let mut store = MemorySettings::new();
        store.put_bool("hasSettings", true).unwrap();
        store.put_i32("servo3_min", 200).unwrap();

        let mut bank = ServoBank::new(NullPwm, store);
        assert!(bank.load_all().unwrap());

        let cal = bank.config(3);
        assert_eq!(cal.min_pulse, 200);
        assert_eq!(cal.max_pulse, 600);
        assert_eq!(cal.center_offset, 0);
        assert_eq!(cal.name, "Servo 4");
        assert_eq!(bank.frequency(), 50);
    }

    #[test]
    fn test_save_all_writes_sentinel_and_frequency() {
        let store = MemorySettings::new();
        let mut bank = ServoBank::new(NullPwm, store.clone());
        bank.save_all().unwrap();

        assert_eq!(store.get_bool("hasSettings").unwrap(), Some(true));
        assert_eq!(store.get_u32("freq").unwrap(), Some(50));
        assert_eq!(store.get_i32("servo15_min").unwrap(), Some(150));
        assert_eq!(store.get_string("servo0_name").unwrap(), Some("Servo 1".to_string()));
    }

    #[test]
    fn test_restore_drives_channels() {
        use crate::pwm::PwmOutput;
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct CountingPwm {
            pulses: Arc<Mutex<Vec<(usize, i32)>>>,
        }

        impl PwmOutput for CountingPwm {
            fn set_channel_pulse(&mut self, channel: usize, pulse: i32) {
                self.pulses.lock().unwrap().push((channel, pulse));
            }
            fn set_frequency(&mut self, _hz: u32) {}
        }

        let pwm = CountingPwm::default();
        let mut bank = ServoBank::new(pwm.clone(), MemorySettings::new());
        bank.restore().unwrap();

        // Every channel driven once, at the default center pulse.
        let pulses = pwm.pulses.lock().unwrap().clone();
        assert_eq!(pulses.len(), SERVO_COUNT);
        assert!(pulses.iter().all(|(_, pulse)| *pulse == 375));
    }
}
