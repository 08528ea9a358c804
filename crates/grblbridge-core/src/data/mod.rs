//! Machine-side data model
//!
//! Types describing the state mirrored from a GRBL-class controller:
//! positions, the command queue state machine, axis limits learned from
//! `$`-settings, and the jog accumulator.

mod gcode;

pub use gcode::{ArcPlane, FeedMode, ModeBlock, ParamBlock, ParamTag};

use serde::{Deserialize, Serialize};

/// A machine axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// X-axis (typically left-right).
    X,
    /// Y-axis (typically front-back).
    Y,
    /// Z-axis (typically up-down).
    Z,
}

impl Axis {
    /// Index into an `[f64; 3]` coordinate triple
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// The G-code word letter for this axis
    pub fn letter(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A three-axis coordinate triple in controller report units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Position {
    /// Create a position from explicit coordinates
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Read one axis
    pub fn axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Write one axis
    pub fn set_axis(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }
}

impl std::ops::Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

/// Command queue state machine
///
/// `Stopped` implies the queue is empty; `Paused` suspends dispatch without
/// cancelling an already-transmitted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueueState {
    /// Nothing pending, dispatch idle.
    #[default]
    Stopped,
    /// Actively dispatching.
    Running,
    /// Suspended, resumable.
    Paused,
}

impl std::fmt::Display for QueueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueState::Stopped => write!(f, "stopped"),
            QueueState::Running => write!(f, "running"),
            QueueState::Paused => write!(f, "paused"),
        }
    }
}

/// Last-known controller status
///
/// Updated only from decoded status reports and `$13`; fields absent from a
/// report keep their previous value (partial updates are normal).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineStatus {
    /// Free-text controller state name ("Idle", "Run", "Alarm", "Jog",
    /// "Locked", ...).
    pub state_name: String,
    /// Machine position from the last status report.
    pub machine_position: Position,
    /// Work coordinate offset from the last report that carried one.
    pub work_offset: Position,
    /// Whether the controller reports (and displays) in inches (`$13=1`).
    pub display_inches: bool,
}

impl MachineStatus {
    /// Work position derived from the machine position and offset
    pub fn work_position(&self) -> Position {
        self.machine_position - self.work_offset
    }

    /// Whether the controller reported the idle state
    pub fn is_idle(&self) -> bool {
        self.state_name == "Idle"
    }
}

impl Default for MachineStatus {
    fn default() -> Self {
        Self {
            state_name: "Init".to_string(),
            machine_position: Position::default(),
            work_offset: Position::default(),
            display_inches: false,
        }
    }
}

/// Per-axis mechanics learned from controller `$`-settings
///
/// All values are undefined until the corresponding setting line arrives;
/// no defaults are assumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisLimits {
    /// Steps per millimeter ($100-$102).
    pub steps_per_mm: [Option<f64>; 3],
    /// Maximum travel in millimeters ($130-$132).
    pub max_travel_mm: [Option<f64>; 3],
    /// Whether the homing cycle is enabled ($22).
    pub homing_enabled: bool,
}

impl AxisLimits {
    /// Steps per millimeter for one axis, if reported yet
    pub fn steps_for(&self, axis: Axis) -> Option<f64> {
        self.steps_per_mm[axis.index()]
    }

    /// Maximum travel for one axis, if reported yet
    pub fn max_travel_for(&self, axis: Axis) -> Option<f64> {
        self.max_travel_mm[axis.index()]
    }
}

/// Jog accumulator
///
/// A target only exists while a jog is in progress; it is captured from the
/// machine position on the first jog and accumulated across consecutive
/// jogs until a status report shows a non-"Jog" state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum JogState {
    /// No jog in progress.
    #[default]
    Idle,
    /// Jogging toward an accumulated machine-coordinate target.
    Jogging {
        /// The accumulated absolute target in machine coordinates.
        target: Position,
    },
}

impl JogState {
    /// Whether a jog is in progress
    pub fn is_active(&self) -> bool {
        matches!(self, JogState::Jogging { .. })
    }
}

/// Which corner of an axis the machine homes to
///
/// GRBL convention puts machine zero at the positive travel limit, making
/// the homed travel range `[-max_travel, 0]`. Machines homed to the other
/// corner use `[0, max_travel]` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TravelConvention {
    /// Machine zero at the positive limit; valid travel is `[-max, 0]`.
    #[default]
    NegativeFromHome,
    /// Machine zero at the negative limit; valid travel is `[0, max]`.
    PositiveFromHome,
}

impl TravelConvention {
    /// Clamp an absolute machine-coordinate target into the homed travel
    /// interval for an axis with the given maximum travel
    pub fn clamp(self, value: f64, max_travel: f64) -> f64 {
        match self {
            TravelConvention::NegativeFromHome => value.clamp(-max_travel, 0.0),
            TravelConvention::PositiveFromHome => value.clamp(0.0, max_travel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_position_is_machine_minus_offset() {
        let status = MachineStatus {
            machine_position: Position::new(10.0, 20.0, -5.0),
            work_offset: Position::new(1.0, 2.0, -1.0),
            ..Default::default()
        };
        assert_eq!(status.work_position(), Position::new(9.0, 18.0, -4.0));
    }

    #[test]
    fn travel_convention_clamps_both_ways() {
        let neg = TravelConvention::NegativeFromHome;
        assert_eq!(neg.clamp(5.0, 100.0), 0.0);
        assert_eq!(neg.clamp(-150.0, 100.0), -100.0);
        assert_eq!(neg.clamp(-50.0, 100.0), -50.0);

        let pos = TravelConvention::PositiveFromHome;
        assert_eq!(pos.clamp(-5.0, 100.0), 0.0);
        assert_eq!(pos.clamp(150.0, 100.0), 100.0);
    }

    #[test]
    fn axis_letters_and_indices() {
        assert_eq!(Axis::X.letter(), 'X');
        assert_eq!(Axis::Z.index(), 2);
        let mut p = Position::default();
        p.set_axis(Axis::Y, 3.5);
        assert_eq!(p.axis(Axis::Y), 3.5);
    }
}
