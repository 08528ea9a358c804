//! Pendant wire protocol
//!
//! Inbound, the panel sends `<CODE>:<integer>` lines: collar rotations
//! (LC/RC), collar pushes (LH/RH), encoder detents at two resolutions
//! (Q1/Q2), and the select/home buttons (SC/SH). Outbound, the bridge sends
//! one fixed-width templated display line per state change plus two single
//! control bytes that switch the panel between its locked and unlocked
//! display modes.

use grblbridge_core::{units, Position};

/// Control byte switching the panel to its locked display mode
pub const DISPLAY_LOCKED: u8 = 0x0E;
/// Control byte switching the panel back to its interactive display mode
pub const DISPLAY_UNLOCKED: u8 = 0x0F;

/// One decoded panel event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelEvent {
    /// Rotate the page collar left by N pages (LC).
    RotateLeft(i32),
    /// Rotate the page collar right by N pages (RC).
    RotateRight(i32),
    /// Jump to the status page (LH).
    JumpHome,
    /// Jump to the origin-select page (RH).
    JumpOrigin,
    /// Fine encoder adjustment by N detents (Q1).
    FineAdjust(i32),
    /// Coarse encoder adjustment by N detents (Q2).
    CoarseAdjust(i32),
    /// Commit/select button (SC).
    Select(i32),
    /// Home button (SH); only the value 2 triggers an auto-home.
    Home(i32),
}

/// Parse one `<CODE>:<integer>` line from the panel
///
/// Returns `None` for unknown codes and malformed integers; such lines are
/// rejected before anything reaches the device session.
pub fn parse_event(line: &str) -> Option<PanelEvent> {
    let (code, value) = line.trim().split_once(':')?;
    let value: i32 = value.trim().parse().ok()?;

    match code {
        "LC" => Some(PanelEvent::RotateLeft(value)),
        "RC" => Some(PanelEvent::RotateRight(value)),
        "LH" => Some(PanelEvent::JumpHome),
        "RH" => Some(PanelEvent::JumpOrigin),
        "Q1" => Some(PanelEvent::FineAdjust(value)),
        "Q2" => Some(PanelEvent::CoarseAdjust(value)),
        "SC" => Some(PanelEvent::Select(value)),
        "SH" => Some(PanelEvent::Home(value)),
        _ => None,
    }
}

/// Render the display line for a page
///
/// Coordinates are shown relative to the current work offset at 3 decimals
/// in millimeter mode and 4 in inch mode. The leading letter of each
/// segment addresses a panel display field; widths are fixed by the panel
/// firmware.
pub fn render_page(page: u8, work: Position, inches: bool, origin: u8) -> String {
    let x = units::format_coordinate(work.x, inches);
    let y = units::format_coordinate(work.y, inches);
    let z = units::format_coordinate(work.z, inches);
    let wcs = 53 + origin as u16;

    match page {
        // Status page: all three axes plus the active origin.
        0 => format!(
            "ax{:>9}|by{:>9}|cz{:>9}|7Origin {} (G{})\n",
            x, y, z, origin, wcs
        ),
        // Single-axis jog pages.
        1 => format!("bx{:>9}|7Origin {} (G{})\n", x, origin, wcs),
        2 => format!("by{:>9}|7Origin {} (G{})\n", y, origin, wcs),
        3 => format!("bz{:>9}|7Origin {} (G{})\n", z, origin, wcs),
        // Origin-select page.
        4 => format!("bOrigin {}|6            G{:>2}\n", origin, wcs),
        _ => String::new(),
    }
}
