//! Jog pendant bridge
//!
//! A hardware keypad/encoder panel on a second serial link co-drives the
//! controller. Its button and encoder events are translated into the same
//! device session operations the web clients use, so both control surfaces
//! are serialized through one queue; device state is reflected back as
//! fixed-width display lines.

pub mod bridge;
pub mod protocol;
pub mod session;

pub use bridge::{BridgeAction, JoggerBridge, JoggerRequest, PanelMessage};
pub use protocol::{parse_event, render_page, PanelEvent, DISPLAY_LOCKED, DISPLAY_UNLOCKED};
pub use session::JoggerSession;
