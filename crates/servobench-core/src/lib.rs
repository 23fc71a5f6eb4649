//! # servobench-core
//!
//! Core servo calibration and position-mapping engine.
//!
//! This crate provides:
//! - Per-channel calibration records and their defaults
//! - The angle-to-pulse position mapper
//! - The servo bank owning the 16-channel configuration array
//! - Persistence of calibration data to a key-value settings store
//!
//! This crate is intentionally runtime-agnostic and contains no async code,
//! making it usable on both Linux hosts and embedded (esp-idf) targets. The
//! PWM peripheral and the non-volatile store are consumed through the
//! [`PwmOutput`] and [`SettingsStore`] capability traits.

pub mod bank;
pub mod calibration;
pub mod mapper;
pub mod motion;
pub mod persist;
pub mod pwm;
pub mod settings;

pub use bank::ServoBank;
pub use calibration::{ServoCalibration, SERVO_COUNT};
pub use motion::{Idle, MotionRoutine};
pub use pwm::{NullPwm, PwmOutput};
pub use settings::{MemorySettings, SettingsStore, StorageError};
