//! Jog target arithmetic
//!
//! A jog starts by snapshotting the machine position; consecutive jogs
//! accumulate on that snapshot until the controller leaves the "Jog" state.
//! The distance argument is in motor steps (as delivered by encoder
//! detents); it is divided by the axis steps-per-mm and the resulting
//! absolute machine-coordinate target is clamped to the homed travel
//! interval before being formatted as a `$J=` command.

use grblbridge_core::{
    units, Axis, AxisLimits, DeviceError, JogState, Position, TravelConvention,
};

/// A computed jog: the accumulated target and the command to enqueue
#[derive(Debug, Clone, PartialEq)]
pub struct JogPlan {
    /// Accumulated absolute target in machine coordinates (millimeters).
    pub target: Position,
    /// Absolute machine-coordinate jog command for the normal queue.
    pub command: String,
}

/// Compute the next jog target and command for one axis
///
/// Refuses (nothing is issued) when steps-per-mm or max-travel for the axis
/// have not arrived from the controller yet.
#[allow(clippy::too_many_arguments)]
pub fn plan_jog(
    jog: JogState,
    machine_position: Position,
    axis: Axis,
    distance_steps: f64,
    limits: &AxisLimits,
    convention: TravelConvention,
    display_inches: bool,
    feed_rate: u32,
) -> Result<JogPlan, DeviceError> {
    if !distance_steps.is_finite() {
        return Err(DeviceError::InvalidInput {
            reason: format!("non-finite jog distance {}", distance_steps),
        });
    }

    let steps_per_mm = limits
        .steps_for(axis)
        .ok_or(DeviceError::AxisLimitsUnknown { axis })?;
    let max_travel = limits
        .max_travel_for(axis)
        .ok_or(DeviceError::AxisLimitsUnknown { axis })?;
    if steps_per_mm <= 0.0 {
        return Err(DeviceError::InvalidInput {
            reason: format!("steps-per-mm for {} is {}", axis, steps_per_mm),
        });
    }

    let mut target = match jog {
        JogState::Jogging { target } => target,
        JogState::Idle => machine_position,
    };

    let clamped = convention.clamp(target.axis(axis) + distance_steps / steps_per_mm, max_travel);
    target.set_axis(axis, clamped);

    let emitted = if display_inches {
        units::mm_to_inches(clamped)
    } else {
        clamped
    };
    let command = format!(
        "$J=F{}G53{}{:.*}",
        feed_rate,
        axis.letter(),
        units::display_precision(display_inches),
        emitted
    );

    Ok(JogPlan { target, command })
}
