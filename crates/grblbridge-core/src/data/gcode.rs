//! Decoded G-code parameter and parser-mode blocks
//!
//! These mirror the controller's `[TAG:...]` and `[GC:...]` reply blocks.
//! Each decoded block replaces the previous one wholesale; nothing here is
//! merged field by field.

use serde::{Deserialize, Serialize};

/// Named coordinate-system / offset tag in a `[TAG:...]` parameter block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamTag {
    /// Work coordinate system 1.
    G54,
    /// Work coordinate system 2.
    G55,
    /// Work coordinate system 3.
    G56,
    /// Work coordinate system 4.
    G57,
    /// Work coordinate system 5.
    G58,
    /// Work coordinate system 6.
    G59,
    /// Predefined position 1.
    G28,
    /// Predefined position 2.
    G30,
    /// Coordinate system offset.
    G92,
    /// Tool length offset (single value).
    Tlo,
    /// Last probe result (carries a trailing success flag).
    Prb,
}

impl ParamTag {
    /// Map a block tag token to a known tag
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "G54" => Some(ParamTag::G54),
            "G55" => Some(ParamTag::G55),
            "G56" => Some(ParamTag::G56),
            "G57" => Some(ParamTag::G57),
            "G58" => Some(ParamTag::G58),
            "G59" => Some(ParamTag::G59),
            "G28" => Some(ParamTag::G28),
            "G30" => Some(ParamTag::G30),
            "G92" => Some(ParamTag::G92),
            "TLO" => Some(ParamTag::Tlo),
            "PRB" => Some(ParamTag::Prb),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParamTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamTag::G54 => write!(f, "G54"),
            ParamTag::G55 => write!(f, "G55"),
            ParamTag::G56 => write!(f, "G56"),
            ParamTag::G57 => write!(f, "G57"),
            ParamTag::G58 => write!(f, "G58"),
            ParamTag::G59 => write!(f, "G59"),
            ParamTag::G28 => write!(f, "G28"),
            ParamTag::G30 => write!(f, "G30"),
            ParamTag::G92 => write!(f, "G92"),
            ParamTag::Tlo => write!(f, "TLO"),
            ParamTag::Prb => write!(f, "PRB"),
        }
    }
}

/// One decoded `[TAG:x,y,z]` / `[TLO:v]` / `[PRB:x,y,z:flag]` block
///
/// TLO carries its single value in `x`; PRB carries its success flag in
/// `other`. Missing coordinate fields decode as 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamBlock {
    /// Which named parameter set this block describes.
    pub tag: ParamTag,
    /// X value (or the scalar value for TLO).
    pub x: f64,
    /// Y value.
    pub y: f64,
    /// Z value.
    pub z: f64,
    /// Trailing value after the second colon, when present (PRB flag).
    pub other: Option<f64>,
}

/// Arc plane selection (G17/G18/G19)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArcPlane {
    /// XY plane (G17).
    #[default]
    Xy,
    /// ZX plane (G18).
    Zx,
    /// ZY plane (G19).
    Zy,
}

/// Feed rate interpretation (G93/G94)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeedMode {
    /// Inverse time mode (G93).
    InverseTime,
    /// Units per minute mode (G94).
    #[default]
    UnitsPerMinute,
}

/// Decoded `[GC:...]` parser-state block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeBlock {
    /// Motion type: 0 rapid, 1 linear, 2 CW arc, 3 CCW arc.
    pub motion: u8,
    /// Active work coordinate system number (54-59).
    pub wcs: u8,
    /// Arc plane.
    pub plane: ArcPlane,
    /// Distance units are inches (G20) rather than millimeters (G21).
    pub inches: bool,
    /// Absolute (G90) rather than relative (G91) coordinates.
    pub absolute: bool,
    /// Feed rate mode.
    pub feed_mode: FeedMode,
    /// Spindle stopped (M5).
    pub spindle_stop: bool,
    /// Coolant on (cleared by M9).
    pub coolant_on: bool,
    /// Tool offset number (T word).
    pub tool: u32,
    /// Feed rate (F word).
    pub feed_rate: f64,
    /// Spindle speed (S word).
    pub spindle_speed: f64,
    /// Mode words the decoder did not recognize; reported as a decoding
    /// fault without aborting the block.
    pub unrecognized: Vec<String>,
}

impl Default for ModeBlock {
    fn default() -> Self {
        Self {
            motion: 0,
            wcs: 54,
            plane: ArcPlane::Xy,
            inches: false,
            absolute: true,
            feed_mode: FeedMode::UnitsPerMinute,
            spindle_stop: false,
            coolant_on: true,
            tool: 0,
            feed_rate: 0.0,
            spindle_speed: 0.0,
            unrecognized: Vec::new(),
        }
    }
}
