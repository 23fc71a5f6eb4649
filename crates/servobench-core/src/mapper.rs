//! Angle-to-pulse position mapping.
//!
//! The logical 0-180 degree sweep is split into two linear segments that
//! meet at a corrected midpoint: applying `center_offset` only to the
//! middle of the sweep compensates for horn misalignment without
//! distorting the end-to-end travel. All arithmetic is integer with
//! truncation toward zero, matching the PWM peripheral's tick units.

use crate::calibration::ServoCalibration;

/// Lowest commandable angle.
pub const ANGLE_MIN: i32 = 0;

/// Highest commandable angle.
pub const ANGLE_MAX: i32 = 180;

/// Center of the sweep, where the offset correction applies.
pub const ANGLE_CENTER: i32 = 90;

/// Clamp an angle into the commandable [0, 180] range.
pub fn clamp_angle(angle: i32) -> i32 {
    angle.clamp(ANGLE_MIN, ANGLE_MAX)
}

/// Integer affine remap of `x` from `[in_min, in_max]` to `[out_min, out_max]`.
///
/// Intermediate math is carried in `i64` and division truncates toward
/// zero. A zero-width input interval returns `out_min` instead of
/// dividing by zero.
pub fn linear_map(x: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    if in_min == in_max {
        return out_min;
    }
    let scaled = (i64::from(x) - i64::from(in_min)) * (i64::from(out_max) - i64::from(out_min))
        / (i64::from(in_max) - i64::from(in_min));
    out_min + scaled as i32
}

/// Compute the pulse width for `angle` under the given calibration.
///
/// `angle` is clamped before mapping. Exactly at 90 degrees the pulse is
/// the linear interpolation over the full sweep plus the center offset;
/// the interpolated value and the truncated `(min + max) / 2` midpoint
/// used by the segments agree for in-range calibrations, but the
/// interpolation form is the contract.
pub fn pulse_for_angle(cal: &ServoCalibration, angle: i32) -> i32 {
    let angle = clamp_angle(angle);

    if angle == ANGLE_CENTER {
        return linear_map(angle, ANGLE_MIN, ANGLE_MAX, cal.min_pulse, cal.max_pulse)
            + cal.center_offset;
    }

    let midpoint = (cal.min_pulse + cal.max_pulse) / 2 + cal.center_offset;
    if angle < ANGLE_CENTER {
        linear_map(angle, ANGLE_MIN, ANGLE_CENTER, cal.min_pulse, midpoint)
    } else {
        linear_map(angle, ANGLE_CENTER, ANGLE_MAX, midpoint, cal.max_pulse)
    }
}
