//! GRBL reply decoding
//!
//! The controller speaks several incompatible reply grammars on one line-
//! oriented stream. [`decode_line`] is the single parsing entry point: it
//! classifies one newline-stripped line into exactly one [`GrblReply`]
//! variant and retains no state between lines.

use super::status_parser::{parse_status, StatusReport};
use grblbridge_core::{ArcPlane, FeedMode, ModeBlock, ParamBlock, ParamTag};
use serde::{Deserialize, Serialize};

/// Classification of a generic (unstructured) reply line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponseKind {
    /// `ok` acknowledgement; releases the in-flight slot.
    Ok,
    /// `error...` rejection of the in-flight command.
    Error(String),
    /// `ALARM...` controller fault.
    Alarm(String),
    /// Anything else, forwarded verbatim for display.
    Other(String),
}

/// One decoded reply line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GrblReply {
    /// `<...>` status report.
    Status(StatusReport),
    /// `$n=v` setting assignment.
    Setting {
        /// Setting number.
        key: u16,
        /// Setting value.
        value: f64,
    },
    /// `[TAG:...]` G-code parameter block.
    Params(ParamBlock),
    /// `[GC:...]` parser-mode block.
    Modes(ModeBlock),
    /// `[MSG:...unlock]` notice: the controller is held in a safety lock
    /// and parser state, settings, and parameters must be re-queried.
    UnlockNotice,
    /// Generic response line.
    Response(ResponseKind),
}

/// Classify one received line
pub fn decode_line(line: &str) -> GrblReply {
    if let Some(report) = parse_status(line) {
        return GrblReply::Status(report);
    }

    if let Some((key, value)) = parse_setting(line) {
        return GrblReply::Setting { key, value };
    }

    if line.len() >= 2 && line.starts_with('[') && line.ends_with(']') {
        let body = &line[1..line.len() - 1];

        if let Some(words) = body.strip_prefix("GC:") {
            return GrblReply::Modes(parse_modes(words));
        }

        if body.starts_with("MSG:") && body.ends_with("unlock") {
            return GrblReply::UnlockNotice;
        }

        if let Some(block) = parse_params(body) {
            return GrblReply::Params(block);
        }
    }

    GrblReply::Response(classify_response(line))
}

fn classify_response(line: &str) -> ResponseKind {
    if line.starts_with("ok") {
        ResponseKind::Ok
    } else if line.starts_with("error") {
        ResponseKind::Error(line.to_string())
    } else if line.starts_with("ALARM") {
        ResponseKind::Alarm(line.to_string())
    } else {
        ResponseKind::Other(line.to_string())
    }
}

/// Parse a `$<digits>=<signed-decimal>` setting line
fn parse_setting(line: &str) -> Option<(u16, f64)> {
    let rest = line.strip_prefix('$')?;
    let (key, value) = rest.split_once('=')?;

    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if value.is_empty() || !value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'.' | b'-')) {
        return None;
    }

    Some((key.parse().ok()?, value.parse().ok()?))
}

/// Parse the body of a `[TAG:f1,f2,f3:f4]` parameter block
///
/// TLO carries a single value (landing in x); PRB carries a trailing flag
/// after the second colon. Missing coordinates decode as 0.
fn parse_params(body: &str) -> Option<ParamBlock> {
    let (token, rest) = body.split_once(':')?;
    let tag = ParamTag::from_token(token)?;

    let (coords, trailer) = match rest.rsplit_once(':') {
        Some((coords, trailer)) => (coords, Some(trailer)),
        None => (rest, None),
    };

    let mut values = coords.split(',').map(|v| v.trim().parse::<f64>().ok());
    Some(ParamBlock {
        tag,
        x: values.next().flatten().unwrap_or(0.0),
        y: values.next().flatten().unwrap_or(0.0),
        z: values.next().flatten().unwrap_or(0.0),
        other: trailer.and_then(|t| t.trim().parse::<f64>().ok()),
    })
}

/// Decode the space-separated words of a `[GC:...]` block
///
/// Unrecognized words are collected on the block so the session can report
/// the decoding fault; they never abort the rest of the block.
fn parse_modes(words: &str) -> ModeBlock {
    let mut block = ModeBlock::default();

    for word in words.split_whitespace() {
        match word {
            "G0" => block.motion = 0,
            "G1" => block.motion = 1,
            "G2" => block.motion = 2,
            "G3" => block.motion = 3,

            "G54" => block.wcs = 54,
            "G55" => block.wcs = 55,
            "G56" => block.wcs = 56,
            "G57" => block.wcs = 57,
            "G58" => block.wcs = 58,
            "G59" => block.wcs = 59,

            "G17" => block.plane = ArcPlane::Xy,
            "G18" => block.plane = ArcPlane::Zx,
            "G19" => block.plane = ArcPlane::Zy,

            "G20" => block.inches = true,
            "G21" => block.inches = false,

            "G90" => block.absolute = true,
            "G91" => block.absolute = false,

            "G93" => block.feed_mode = FeedMode::InverseTime,
            "G94" => block.feed_mode = FeedMode::UnitsPerMinute,

            "M5" => block.spindle_stop = true,
            "M9" => block.coolant_on = false,

            _ => {
                let value = word.get(1..).unwrap_or("");
                let known = match word.as_bytes().first() {
                    Some(b'T') => value.parse::<u32>().map(|v| block.tool = v).is_ok(),
                    Some(b'F') => value.parse::<f64>().map(|v| block.feed_rate = v).is_ok(),
                    Some(b'S') => value.parse::<f64>().map(|v| block.spindle_speed = v).is_ok(),
                    _ => false,
                };
                if !known {
                    block.unrecognized.push(word.to_string());
                }
            }
        }
    }

    block
}
