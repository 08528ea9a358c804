//! Event type definitions for the device bus.
//!
//! One event kind per outbound broadcast channel: machine status, console
//! display lines, `$`-settings, parameter blocks, and parser-mode blocks.
//! Events are cloneable snapshots; subscribers never see mutable state.

use serde::{Deserialize, Serialize};

use crate::data::{ModeBlock, ParamBlock, Position, QueueState};

/// Which console channel a display line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleMode {
    /// A queued command as it was transmitted.
    Command,
    /// A queue-bypassing command or notice.
    Immediate,
    /// A verbatim controller reply.
    Response,
}

impl std::fmt::Display for ConsoleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsoleMode::Command => write!(f, "command"),
            ConsoleMode::Immediate => write!(f, "immediate"),
            ConsoleMode::Response => write!(f, "response"),
        }
    }
}

/// Machine status snapshot broadcast after every status-affecting change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineStateEvent {
    /// Controller state name.
    pub state_name: String,
    /// Machine position.
    pub machine_position: Position,
    /// Work position (machine position minus work offset).
    pub work_position: Position,
    /// Commands currently pending in the queue.
    pub queue_length: usize,
    /// High-water mark since the queue last drained.
    pub queue_max: usize,
    /// Queue state machine.
    pub queue_state: QueueState,
    /// Whether coordinates are in inches.
    pub display_inches: bool,
}

/// Root event enum broadcast to all subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeviceEvent {
    /// Machine status snapshot.
    MachineState(MachineStateEvent),
    /// A console display line.
    ConsoleDisplay {
        /// Which console channel the line belongs to.
        mode: ConsoleMode,
        /// The display text.
        message: String,
    },
    /// A decoded `$n=v` setting line.
    GrblSetting {
        /// Setting number.
        key: u16,
        /// Setting value.
        value: f64,
    },
    /// A decoded `[TAG:...]` parameter block.
    GcodeParams(ParamBlock),
    /// A decoded `[GC:...]` parser-mode block.
    GcodeModes(ModeBlock),
}

impl DeviceEvent {
    /// Short description for logging
    pub fn description(&self) -> String {
        match self {
            DeviceEvent::MachineState(s) => {
                format!("machine-status {} ({} queued)", s.state_name, s.queue_length)
            }
            DeviceEvent::ConsoleDisplay { mode, message } => {
                format!("console-display [{}] {}", mode, message)
            }
            DeviceEvent::GrblSetting { key, value } => format!("grbl-setting ${}={}", key, value),
            DeviceEvent::GcodeParams(block) => format!("gcode-parameters {}", block.tag),
            DeviceEvent::GcodeModes(block) => format!("gcode-mode wcs G{}", block.wcs),
        }
    }
}
