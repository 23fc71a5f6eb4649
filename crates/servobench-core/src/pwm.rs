//! PWM peripheral capability.
//!
//! The servo bank drives its channels through this trait instead of a
//! concrete I2C driver, so the same core runs against a PCA9685-style
//! backend on device and against fakes in tests. The capability is
//! modeled as infallible: the underlying bus driver owns retry and
//! error reporting.

/// Abstract PWM output with per-channel pulse control.
pub trait PwmOutput: Send + Sync {
    /// Set the "on" pulse width for one channel, in device ticks.
    fn set_channel_pulse(&mut self, channel: usize, pulse: i32);

    /// Set the global PWM frequency in Hz.
    fn set_frequency(&mut self, hz: u32);
}

/// PWM backend that discards all output.
///
/// Useful for tests and for running the command engine without hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPwm;

impl PwmOutput for NullPwm {
    fn set_channel_pulse(&mut self, _channel: usize, _pulse: i32) {}

    fn set_frequency(&mut self, _hz: u32) {}
}
