//! Pendant page/lock state machine
//!
//! Pure state: panel events come in, panel messages and device requests
//! come out. The session layer owns the serial wiring.
//!
//! Pages: 0 status, 1 jog-X, 2 jog-Y, 3 jog-Z, 4 origin-select. While
//! `locked`, inbound events are ignored except `SH:2` (auto-home), so the
//! operator can always recover a machine that is sitting in an alarm.

use super::protocol::{render_page, PanelEvent, DISPLAY_LOCKED, DISPLAY_UNLOCKED};
use grblbridge_core::{Axis, DeviceEvent, Position};

/// A request for the device session, translated from panel input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JoggerRequest {
    /// Jog one axis by a signed distance in motor steps.
    Jog {
        /// Axis of the active jog page.
        axis: Axis,
        /// Signed distance in steps.
        steps: f64,
    },
    /// Zero one axis of a work coordinate system (`G10L20P<origin><axis>0`).
    ZeroAxis {
        /// Axis of the active jog page.
        axis: Axis,
        /// Origin slot 1-6.
        origin: u8,
    },
    /// Switch the active work coordinate system (`G<53+origin>`).
    SelectWcs {
        /// Origin slot 1-6.
        origin: u8,
    },
    /// Home (or unlock) the machine.
    AutoHome,
}

/// Something to transmit to the panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelMessage {
    /// A formatted display line.
    Display(String),
    /// A single display-mode control byte.
    Mode(u8),
}

/// Result of handling one panel event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BridgeAction {
    /// Messages for the panel link.
    pub messages: Vec<PanelMessage>,
    /// At most one request for the device session.
    pub request: Option<JoggerRequest>,
}

impl BridgeAction {
    fn request(request: JoggerRequest) -> Self {
        Self {
            messages: Vec::new(),
            request: Some(request),
        }
    }
}

/// Pendant UI state
#[derive(Debug)]
pub struct JoggerBridge {
    current_page: u8,
    saved_page: u8,
    origin: u8,
    locked: bool,
    work: Position,
    inches: bool,
}

impl Default for JoggerBridge {
    fn default() -> Self {
        Self {
            current_page: 0,
            saved_page: 0,
            origin: 1,
            // Locked until the first status broadcast proves the machine
            // is idle.
            locked: true,
            work: Position::default(),
            inches: false,
        }
    }
}

impl JoggerBridge {
    /// Create a bridge in its initial (locked, status page) state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current page index
    pub fn current_page(&self) -> u8 {
        self.current_page
    }

    /// Selected origin slot (1-6)
    pub fn origin(&self) -> u8 {
        self.origin
    }

    /// Whether panel input is currently ignored
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Handle one inbound panel event
    pub fn handle_event(&mut self, event: PanelEvent) -> BridgeAction {
        if self.locked {
            // The home button is the one control honored while locked.
            if let PanelEvent::Home(2) = event {
                return BridgeAction::request(JoggerRequest::AutoHome);
            }
            return BridgeAction::default();
        }

        match event {
            PanelEvent::RotateLeft(n) => self.set_page(Self::rotate(self.current_page, -n)),
            PanelEvent::RotateRight(n) => self.set_page(Self::rotate(self.current_page, n)),
            PanelEvent::JumpHome => self.set_page(0),
            PanelEvent::JumpOrigin => self.set_page(4),
            PanelEvent::FineAdjust(n) => self.adjust(n, 1.0),
            PanelEvent::CoarseAdjust(n) => self.adjust(n, 100.0),
            PanelEvent::Select(_) => match self.active_axis() {
                Some(axis) => BridgeAction::request(JoggerRequest::ZeroAxis {
                    axis,
                    origin: self.origin,
                }),
                None if self.current_page == 4 => {
                    BridgeAction::request(JoggerRequest::SelectWcs {
                        origin: self.origin,
                    })
                }
                None => BridgeAction::default(),
            },
            PanelEvent::Home(2) => BridgeAction::request(JoggerRequest::AutoHome),
            PanelEvent::Home(_) => BridgeAction::default(),
        }
    }

    /// Reflect a device broadcast onto the panel
    pub fn on_device_event(&mut self, event: &DeviceEvent) -> Vec<PanelMessage> {
        match event {
            DeviceEvent::MachineState(status) => {
                let mut changed = false;
                let mut messages = Vec::new();

                if status.work_position != self.work {
                    self.work = status.work_position;
                    changed = true;
                }
                if status.display_inches != self.inches {
                    self.inches = status.display_inches;
                    changed = true;
                }

                // Busy predicate: a non-empty queue locks always; otherwise
                // only a state that is neither Idle nor Jog does. Jogging by
                // itself must not lock the panel out of its own jog page.
                let locked = match status.state_name.as_str() {
                    "Idle" | "Jog" => status.queue_length > 0,
                    _ => true,
                };

                if locked != self.locked {
                    self.locked = locked;
                    if locked {
                        self.saved_page = self.current_page;
                        if self.current_page != 0 {
                            self.current_page = 0;
                            changed = true;
                        }
                        messages.push(PanelMessage::Mode(DISPLAY_LOCKED));
                    } else {
                        if self.current_page != self.saved_page {
                            self.current_page = self.saved_page;
                            changed = true;
                        }
                        messages.push(PanelMessage::Mode(DISPLAY_UNLOCKED));
                    }
                }

                if changed {
                    messages.push(self.display());
                }
                messages
            }
            DeviceEvent::GcodeModes(modes) => {
                let origin = modes.wcs.saturating_sub(53);
                if (1..=6).contains(&origin) && origin != self.origin {
                    self.origin = origin;
                    vec![self.display()]
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }

    fn set_page(&mut self, page: u8) -> BridgeAction {
        self.current_page = page;
        BridgeAction {
            messages: vec![self.display()],
            request: None,
        }
    }

    fn adjust(&mut self, detents: i32, multiplier: f64) -> BridgeAction {
        if let Some(axis) = self.active_axis() {
            return BridgeAction::request(JoggerRequest::Jog {
                axis,
                steps: detents as f64 * multiplier,
            });
        }

        if self.current_page == 4 {
            self.origin = Self::rotate_origin(self.origin, detents);
            return BridgeAction {
                messages: vec![self.display()],
                request: None,
            };
        }

        BridgeAction::default()
    }

    fn active_axis(&self) -> Option<Axis> {
        match self.current_page {
            1 => Some(Axis::X),
            2 => Some(Axis::Y),
            3 => Some(Axis::Z),
            _ => None,
        }
    }

    fn rotate(page: u8, delta: i32) -> u8 {
        (page as i32 + delta).rem_euclid(5) as u8
    }

    fn rotate_origin(origin: u8, delta: i32) -> u8 {
        ((origin as i32 + delta - 1).rem_euclid(6) + 1) as u8
    }

    fn display(&self) -> PanelMessage {
        PanelMessage::Display(render_page(
            self.current_page,
            self.work,
            self.inches,
            self.origin,
        ))
    }
}
