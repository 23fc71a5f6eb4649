//! Run-mode persistence.
//!
//! The system boots into one of two modes: calibration (the command
//! transport is up and accepts clients) or working (transport down, the
//! motion routine drives the bank). The selection survives reboots in
//! the same settings file the calibration data lives in.

use servobench_core::{SettingsStore, StorageError};

const KEY_MODE: &str = "calibMode";

/// The mode the host runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Transport up, servos driven by external commands.
    Calibration,
    /// Transport down, servos driven by the motion routine.
    Working,
}

/// Load the persisted run mode.
///
/// Defaults to calibration when no mode was ever saved, so a fresh
/// headless host is reachable over the transport.
pub fn load_mode<S: SettingsStore>(settings: &S) -> Result<RunMode, StorageError> {
    Ok(match settings.get_bool(KEY_MODE)? {
        Some(false) => RunMode::Working,
        _ => RunMode::Calibration,
    })
}

/// Persist the run mode for the next boot.
pub fn save_mode<S: SettingsStore>(settings: &mut S, mode: RunMode) -> Result<(), StorageError> {
    settings.put_bool(KEY_MODE, mode == RunMode::Calibration)
}
