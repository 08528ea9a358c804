//! GRBL `$`-setting keys
//!
//! A handful of settings carry side effects for the position and jog
//! engine; the rest are forwarded to subscribers untouched.

use grblbridge_core::{Axis, AxisLimits};

/// `$13` - report (and display) in inches
pub const REPORT_INCHES: u16 = 13;
/// `$22` - homing cycle enable
pub const HOMING_ENABLE: u16 = 22;
/// `$100` - X steps per millimeter
pub const STEPS_PER_MM_X: u16 = 100;
/// `$101` - Y steps per millimeter
pub const STEPS_PER_MM_Y: u16 = 101;
/// `$102` - Z steps per millimeter
pub const STEPS_PER_MM_Z: u16 = 102;
/// `$130` - X maximum travel in millimeters
pub const MAX_TRAVEL_X: u16 = 130;
/// `$131` - Y maximum travel in millimeters
pub const MAX_TRAVEL_Y: u16 = 131;
/// `$132` - Z maximum travel in millimeters
pub const MAX_TRAVEL_Z: u16 = 132;

/// Apply a decoded setting to the axis limits
///
/// Returns true when the key was one the jog engine consumes.
pub fn apply_setting(limits: &mut AxisLimits, key: u16, value: f64) -> bool {
    match key {
        HOMING_ENABLE => limits.homing_enabled = value != 0.0,
        STEPS_PER_MM_X => limits.steps_per_mm[Axis::X.index()] = Some(value),
        STEPS_PER_MM_Y => limits.steps_per_mm[Axis::Y.index()] = Some(value),
        STEPS_PER_MM_Z => limits.steps_per_mm[Axis::Z.index()] = Some(value),
        MAX_TRAVEL_X => limits.max_travel_mm[Axis::X.index()] = Some(value),
        MAX_TRAVEL_Y => limits.max_travel_mm[Axis::Y.index()] = Some(value),
        MAX_TRAVEL_Z => limits.max_travel_mm[Axis::Z.index()] = Some(value),
        _ => return false,
    }
    true
}

/// Human-readable name for a setting key
pub fn setting_name(key: u16) -> &'static str {
    match key {
        0 => "Step pulse time",
        1 => "Step idle delay",
        10 => "Status report options",
        11 => "Junction deviation",
        12 => "Arc tolerance",
        13 => "Report in inches",
        20 => "Soft limits enable",
        21 => "Hard limits enable",
        22 => "Homing cycle enable",
        100 => "X steps per mm",
        101 => "Y steps per mm",
        102 => "Z steps per mm",
        110 => "X max rate",
        111 => "Y max rate",
        112 => "Z max rate",
        120 => "X acceleration",
        121 => "Y acceleration",
        122 => "Z acceleration",
        130 => "X max travel",
        131 => "Y max travel",
        132 => "Z max travel",
        _ => "Unknown setting",
    }
}
