//! Hook for motion logic driving the positioning API.
//!
//! Motion planning, inverse kinematics and choreography live outside this
//! crate; implementations of [`MotionRoutine`] get periodic ticks from
//! the host's working-mode loop and command the bank through its normal
//! mutators.

use crate::bank::ServoBank;
use crate::pwm::PwmOutput;
use crate::settings::SettingsStore;

/// A routine invoked periodically while the system is in working mode.
pub trait MotionRoutine<P: PwmOutput, S: SettingsStore>: Send {
    /// One step of the routine. Called at the host's working-loop rate.
    fn tick(&mut self, bank: &mut ServoBank<P, S>);
}

/// Routine that commands nothing. The default when no motion logic is
/// installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Idle;

impl<P: PwmOutput, S: SettingsStore> MotionRoutine<P, S> for Idle {
    fn tick(&mut self, _bank: &mut ServoBank<P, S>) {}
}
